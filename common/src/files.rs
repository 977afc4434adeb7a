//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

extern crate csv;

use std::path::Path;
use std::str::FromStr;

use rayon::prelude::ParallelSliceMut;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Row {row}: cannot parse {value:?} as a signed integer")]
    Parse { row: usize, value: String },

    #[error("Row {row}: expected a key and a value, got {len} columns")]
    Shape { row: usize, len: usize },
}

/// A row of the form `key,value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedValue {
    pub key: String,
    pub value: i64,
}

impl KeyedValue {
    pub fn new(row: usize, vals: &[String]) -> Result<KeyedValue, FileError> {
        match vals {
            [key, value] => {
                let value = i64::from_str(value.trim()).map_err(|_| FileError::Parse {
                    row,
                    value: value.to_string(),
                })?;
                Ok(KeyedValue {
                    key: key.trim().to_string(),
                    value,
                })
            }
            _ => Err(FileError::Shape {
                row,
                len: vals.len(),
            }),
        }
    }
}

/// Reads CSV file into vector of rows,
/// where each row is represented as a vector of strings
///
/// Rows may have different lengths, values are trimmed
pub fn read_csv_as_strings<T>(filename: T, has_headers: bool) -> Result<Vec<Vec<String>>, FileError>
where
    T: AsRef<Path>,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .flexible(true)
        .has_headers(has_headers)
        .from_path(filename)?;
    let mut res: Vec<Vec<String>> = Vec::new();
    for row in reader.records() {
        res.push(
            row?.iter()
                .map(|z| String::from(z.trim()))
                .collect::<Vec<String>>(),
        );
    }
    Ok(res)
}

/// Reads CSV file into vector of rows,
/// where each row is a key followed by one signed integer
pub fn read_csv_as_keyed_values<T>(
    filename: T,
    has_headers: bool,
) -> Result<Vec<KeyedValue>, FileError>
where
    T: AsRef<Path>,
{
    read_csv_as_strings(filename, has_headers)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| KeyedValue::new(i, &row))
        .collect::<Result<Vec<KeyedValue>, FileError>>()
}

/// Function to save a vector of vector of strings to the CSV file
/// The rows are sorted by the first column before writing
pub fn write_vec_to_csv<T>(rows: &mut Vec<Vec<String>>, path: T) -> Result<(), FileError>
where
    T: AsRef<Path>,
{
    let mut wr = csv::WriterBuilder::new()
        .buffer_capacity(1024)
        .flexible(true)
        .from_path(path)?;
    rows.par_sort_unstable_by(|a, b| a.first().cmp(&b.first()));

    for line in rows.drain(..) {
        wr.write_record(line.as_slice())?;
    }
    wr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_value_shape() {
        let ok = KeyedValue::new(0, &[String::from("a"), String::from(" -10 ")]).unwrap();
        assert_eq!(
            ok,
            KeyedValue {
                key: String::from("a"),
                value: -10
            }
        );

        assert!(matches!(
            KeyedValue::new(3, &[String::from("a")]),
            Err(FileError::Shape { row: 3, len: 1 })
        ));
        assert!(matches!(
            KeyedValue::new(1, &[String::from("a"), String::from("x")]),
            Err(FileError::Parse { row: 1, .. })
        ));
    }
}
