//! Binary caching of matrices and diagonalization results.
//!
//! Diagonalizing large differentials is expensive, so reduced matrices and
//! their ledgers can be written to disk and picked up again later. Loading
//! needs auxiliary data that the bytes do not carry, most importantly the
//! coefficient field, which is what the `AuxData` associated type is for.

use std::{
    fs::File,
    io,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_bigint::BigInt;

use crate::{
    field::{Field, Fp, Rationals},
    matrix::{Diagonal, MatrixBool, MatrixField, RowOp},
    modular::Zm,
    rational::Rational,
    vector::{VectorBool, VectorField},
};

pub trait Save {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()>;
}

pub trait Load: Sized {
    type AuxData;

    fn load(buffer: &mut impl Read, data: &Self::AuxData) -> io::Result<Self>;
}

pub fn save_to_file<T: Save>(value: &T, path: impl AsRef<Path>) -> io::Result<()> {
    let mut buffer = BufWriter::new(File::create(path)?);
    value.save(&mut buffer)?;
    buffer.flush()
}

pub fn load_from_file<T: Load>(path: impl AsRef<Path>, data: &T::AuxData) -> io::Result<T> {
    let mut buffer = BufReader::new(File::open(path)?);
    T::load(&mut buffer, data)
}

impl Save for u32 {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        buffer.write_u32::<LittleEndian>(*self)
    }
}

impl Load for u32 {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        buffer.read_u32::<LittleEndian>()
    }
}

impl Save for u64 {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        buffer.write_u64::<LittleEndian>(*self)
    }
}

impl Load for u64 {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        buffer.read_u64::<LittleEndian>()
    }
}

impl Save for usize {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        buffer.write_u64::<LittleEndian>(*self as u64)
    }
}

impl Load for usize {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        let value = buffer.read_u64::<LittleEndian>()?;
        usize::try_from(value)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "length overflows usize"))
    }
}

impl Save for bool {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        buffer.write_u8(u8::from(*self))
    }
}

impl Load for bool {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        match buffer.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid boolean byte {other}"),
            )),
        }
    }
}

impl Save for (usize, usize) {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.0.save(buffer)?;
        self.1.save(buffer)
    }
}

impl Load for (usize, usize) {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        Ok((usize::load(buffer, &())?, usize::load(buffer, &())?))
    }
}

impl<T: Save> Save for Vec<T> {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.len().save(buffer)?;
        for item in self {
            item.save(buffer)?;
        }
        Ok(())
    }
}

impl<T: Load> Load for Vec<T> {
    type AuxData = T::AuxData;

    fn load(buffer: &mut impl Read, data: &T::AuxData) -> io::Result<Self> {
        let len = usize::load(buffer, &())?;
        let mut result = Vec::with_capacity(len);
        for _ in 0..len {
            result.push(T::load(buffer, data)?);
        }
        Ok(result)
    }
}

impl Save for Diagonal {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.entries().to_vec().save(buffer)
    }
}

impl Load for Diagonal {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        Ok(Diagonal::from_entries(Vec::load(buffer, &())?))
    }
}

fn save_bigint(value: &BigInt, buffer: &mut impl Write) -> io::Result<()> {
    let bytes = value.to_signed_bytes_le();
    bytes.len().save(buffer)?;
    buffer.write_all(&bytes)
}

fn load_bigint(buffer: &mut impl Read) -> io::Result<BigInt> {
    let len = usize::load(buffer, &())?;
    let mut bytes = vec![0; len];
    buffer.read_exact(&mut bytes)?;
    Ok(BigInt::from_signed_bytes_le(&bytes))
}

impl Save for Rational {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        save_bigint(self.numerator(), buffer)?;
        save_bigint(self.denominator(), buffer)
    }
}

impl Load for Rational {
    type AuxData = Rationals;

    fn load(buffer: &mut impl Read, _: &Rationals) -> io::Result<Self> {
        let num = load_bigint(buffer)?;
        let den = load_bigint(buffer)?;
        if den.sign() == num_bigint::Sign::NoSign {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "rational with zero denominator",
            ));
        }
        Ok(Rational::normalized(num, den))
    }
}

impl Save for Zm {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.value().save(buffer)
    }
}

impl Load for Zm {
    type AuxData = Fp;

    fn load(buffer: &mut impl Read, field: &Fp) -> io::Result<Self> {
        let value = u32::load(buffer, &())?;
        if value >= field.prime().as_u32() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("residue {value} out of range modulo {}", field.prime()),
            ));
        }
        Ok(Zm::new(field.prime(), value))
    }
}

impl<C: Save> Save for RowOp<C> {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.row_1.save(buffer)?;
        self.row_2.save(buffer)?;
        self.col.save(buffer)?;
        self.coeff.save(buffer)
    }
}

impl<C: Load> Load for RowOp<C> {
    type AuxData = C::AuxData;

    fn load(buffer: &mut impl Read, data: &C::AuxData) -> io::Result<Self> {
        Ok(RowOp {
            row_1: usize::load(buffer, &())?,
            row_2: usize::load(buffer, &())?,
            col: usize::load(buffer, &())?,
            coeff: C::load(buffer, data)?,
        })
    }
}

impl<F: Field> Save for VectorField<F> {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.dimension().save(buffer)?;
        for i in 0..self.dimension() {
            self.entry(i).save(buffer)?;
        }
        Ok(())
    }
}

impl<F: Field> Load for VectorField<F> {
    type AuxData = F;

    fn load(buffer: &mut impl Read, field: &F) -> io::Result<Self> {
        let dimension = usize::load(buffer, &())?;
        let mut vector = VectorField::new(*field, dimension);
        for i in 0..dimension {
            vector.set_entry(i, F::Element::load(buffer, field)?);
        }
        Ok(vector)
    }
}

impl Save for VectorBool {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.dimension().save(buffer)?;
        for i in 0..self.dimension() {
            self.entry(i).save(buffer)?;
        }
        Ok(())
    }
}

impl Load for VectorBool {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        let dimension = usize::load(buffer, &())?;
        let mut vector = VectorBool::new(dimension);
        for i in 0..dimension {
            vector.set_entry(i, bool::load(buffer, &())?);
        }
        Ok(vector)
    }
}

impl<F: Field> Save for MatrixField<F> {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.num_rows().save(buffer)?;
        self.num_cols().save(buffer)?;
        for row in self.rows() {
            for entry in row {
                entry.save(buffer)?;
            }
        }
        self.transposed().save(buffer)?;
        self.is_diagonalized().save(buffer)?;
        self.diagonal().save(buffer)?;
        self.records_base_changes().save(buffer)?;
        self.base_changes().to_vec().save(buffer)
    }
}

impl<F: Field> Load for MatrixField<F> {
    type AuxData = F;

    fn load(buffer: &mut impl Read, field: &F) -> io::Result<Self> {
        let num_rows = usize::load(buffer, &())?;
        let num_cols = usize::load(buffer, &())?;
        let mut matrix = MatrixField::new(*field, num_rows, num_cols);
        for row in 0..num_rows {
            for col in 0..num_cols {
                matrix.set_entry(row, col, F::Element::load(buffer, field)?);
            }
        }
        matrix.set_transposed(bool::load(buffer, &())?);
        let diagonalized = bool::load(buffer, &())?;
        let diagonal = Diagonal::load(buffer, &())?;
        matrix.record_base_changes(bool::load(buffer, &())?);
        matrix.set_base_changes(Vec::load(buffer, field)?);
        if diagonalized {
            matrix.set_diagonal(diagonal);
            matrix.mark_diagonalized();
        }
        Ok(matrix)
    }
}

impl Save for MatrixBool {
    fn save(&self, buffer: &mut impl Write) -> io::Result<()> {
        self.num_rows().save(buffer)?;
        self.num_cols().save(buffer)?;
        for row in self.rows() {
            for limb in row {
                limb.save(buffer)?;
            }
        }
        self.transposed().save(buffer)?;
        self.is_diagonalized().save(buffer)?;
        self.diagonal().save(buffer)
    }
}

impl Load for MatrixBool {
    type AuxData = ();

    fn load(buffer: &mut impl Read, _: &()) -> io::Result<Self> {
        let num_rows = usize::load(buffer, &())?;
        let num_cols = usize::load(buffer, &())?;
        let mut matrix = MatrixBool::new(num_rows, num_cols);
        let limbs = num_cols.div_ceil(u64::BITS as usize);
        for row in 0..num_rows {
            for limb in 0..limbs {
                matrix.set_limb(row, limb, u64::load(buffer, &())?);
            }
        }
        matrix.set_transposed(bool::load(buffer, &())?);
        let diagonalized = bool::load(buffer, &())?;
        let diagonal = Diagonal::load(buffer, &())?;
        if diagonalized {
            matrix.set_diagonal(diagonal);
            matrix.mark_diagonalized();
        }
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{diagonalizer::Diagonalizer, prime::ValidPrime};

    use super::*;

    #[test]
    fn diagonalized_matrix_survives_a_cache_cycle() {
        let mut m =
            MatrixField::from_vec(Rationals, &[vec![2, 1, 1], vec![1, -1, 2], vec![0, 1, -1]]);
        m.record_base_changes(true);
        Diagonalizer::sequential().diagonalize(&mut m).unwrap();

        let mut bytes = Vec::new();
        m.save(&mut bytes).unwrap();
        let loaded: MatrixField<Rationals> =
            MatrixField::load(&mut Cursor::new(&bytes), &Rationals).unwrap();

        assert!(loaded.is_diagonalized());
        assert_eq!(loaded.diagonal(), m.diagonal());
        assert_eq!(loaded.base_changes(), m.base_changes());
        assert_eq!(loaded.entry(1, 1), m.entry(1, 1));
    }

    #[test]
    fn residue_out_of_range_is_rejected() {
        let field = Fp::new(ValidPrime::new(5));
        let mut bytes = Vec::new();
        7u32.save(&mut bytes).unwrap();
        let result = Zm::load(&mut Cursor::new(&bytes), &field);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn zero_denominator_is_rejected() {
        let mut bytes = Vec::new();
        save_bigint(&BigInt::from(1), &mut bytes).unwrap();
        save_bigint(&BigInt::from(0), &mut bytes).unwrap();
        let result = Rational::load(&mut Cursor::new(&bytes), &Rationals);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut m = MatrixBool::new(2, 2);
        m.set_entry(0, 1, true);
        let mut bytes = Vec::new();
        m.save(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(MatrixBool::load(&mut Cursor::new(&bytes), &()).is_err());
    }
}
