//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

extern crate common;

use std::path::Path;

use common::files;
use common::timer;

use crate::error::ProtocolError;
use crate::shared::TValue;

/// Loads participant 1 identifiers, one per row, from the first column
///
/// Blank cells are skipped. A file without identifiers yields an empty
/// set, the session then completes with an empty intersection.
pub fn load_identifiers<T>(input_path: T) -> Result<Vec<String>, ProtocolError>
where
    T: AsRef<Path>,
{
    let t = timer::Timer::new_silent("load_identifiers");
    let ids = files::read_csv_as_strings(input_path, false)?
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter(|id| !id.is_empty())
        .collect::<Vec<String>>();

    if ids.is_empty() {
        warn!("{}", ProtocolError::EmptyInputSet);
    }
    t.qps("identifiers loaded", ids.len());
    Ok(ids)
}

/// Loads participant 2 rows of the form `identifier,value`
pub fn load_identifier_values<T>(input_path: T) -> Result<Vec<(String, TValue)>, ProtocolError>
where
    T: AsRef<Path>,
{
    let t = timer::Timer::new_silent("load_identifier_values");
    let pairs = files::read_csv_as_keyed_values(input_path, false)?
        .into_iter()
        .map(|kv| (kv.key, kv.value))
        .collect::<Vec<(String, TValue)>>();

    if pairs.is_empty() {
        warn!("{}", ProtocolError::EmptyInputSet);
    }
    t.qps("identifier values loaded", pairs.len());
    Ok(pairs)
}
