//  Copyright (c) Facebook, Inc. and its affiliates.
//  SPDX-License-Identifier: Apache-2.0

use clap::App;
use clap::Arg;
use log::info;
use rand::distributions;
use rand::thread_rng;
use rand::Rng;

pub mod gen {
    use super::*;
    use rand::prelude::SliceRandom;
    use rayon::iter::IntoParallelIterator;
    use rayon::iter::ParallelIterator;

    pub struct Data {
        pub p1_ids: Vec<String>,
        pub p2_pairs: Vec<(String, i64)>,
        pub expected_size: usize,
        pub expected_sum: i64,
    }

    /// Identifier sets of the two participants sharing `intersection_size` items
    pub fn random_data(
        p1_size: usize,
        p2_size: usize,
        intersection_size: usize,
        max_value: i64,
    ) -> Data {
        let string_len = 16;
        let intersection = par_random_string(intersection_size, string_len);
        let mut rng = thread_rng();

        let mut p1_ids = par_random_string(p1_size, string_len);
        p1_ids.extend_from_slice(&intersection);
        p1_ids.shuffle(&mut rng);

        let mut p2_ids = par_random_string(p2_size, string_len);
        p2_ids.extend_from_slice(&intersection);
        p2_ids.shuffle(&mut rng);

        let p2_pairs = p2_ids
            .into_iter()
            .map(|id| (id, rng.gen_range(-max_value..=max_value)))
            .collect::<Vec<(String, i64)>>();

        let expected_sum = p2_pairs
            .iter()
            .filter(|(id, _)| intersection.contains(id))
            .map(|(_, v)| v)
            .sum();

        Data {
            p1_ids,
            p2_pairs,
            expected_size: intersection_size,
            expected_sum,
        }
    }

    pub fn par_random_string(size: usize, string_len: usize) -> Vec<String> {
        (0..size)
            .into_par_iter()
            .map(|_| random_string(string_len))
            .collect::<Vec<String>>()
    }

    /// Method to use to generate dummy random string for inputs
    ///
    /// to be used only for dummy string generation
    fn random_string(size: usize) -> String {
        thread_rng()
            .sample_iter(&distributions::Alphanumeric)
            .take(size)
            .map(char::from)
            .collect()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = App::new("Private intersection-sum data generator")
        .version("0.1")
        .about("Generates the inputs of both participants")
        .arg(
            Arg::with_name("dir")
                .short("d")
                .long("dir")
                .value_name("DIR")
                .help("output dir")
                .takes_value(true)
                .default_value("./"),
        )
        .arg(
            Arg::with_name("size-p1")
                .long("size-p1")
                .value_name("SIZE")
                .help("identifiers owned only by participant 1")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("size-p2")
                .long("size-p2")
                .value_name("SIZE")
                .help("identifiers owned only by participant 2")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("intersection")
                .short("i")
                .long("intersection")
                .value_name("SIZE")
                .help("identifiers owned by both")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name("max-value")
                .long("max-value")
                .value_name("VALUE")
                .help("values are drawn from [-VALUE, VALUE]")
                .takes_value(true)
                .default_value("1000"),
        )
        .get_matches();

    let p1_size = matches.value_of("size-p1").unwrap_or("10").parse::<usize>()?;
    let p2_size = matches.value_of("size-p2").unwrap_or("10").parse::<usize>()?;
    let intersection = matches
        .value_of("intersection")
        .unwrap_or("5")
        .parse::<usize>()?;
    let max_value = matches
        .value_of("max-value")
        .unwrap_or("1000")
        .parse::<i64>()?
        .abs();
    let dir = matches.value_of("dir").unwrap_or("./");

    let fn_p1 = format!("{}/p1_ids.csv", dir);
    let fn_p2 = format!("{}/p2_pairs.csv", dir);

    info!(
        "Generating p1: {}, p2: {}, intersection: {}",
        p1_size + intersection,
        p2_size + intersection,
        intersection
    );
    let data = gen::random_data(p1_size, p2_size, intersection, max_value);

    let mut p1_rows = data
        .p1_ids
        .into_iter()
        .map(|id| vec![id])
        .collect::<Vec<Vec<String>>>();
    common::files::write_vec_to_csv(&mut p1_rows, &fn_p1)?;
    info!("File {} finished", fn_p1);

    let mut p2_rows = data
        .p2_pairs
        .into_iter()
        .map(|(id, v)| vec![id, v.to_string()])
        .collect::<Vec<Vec<String>>>();
    common::files::write_vec_to_csv(&mut p2_rows, &fn_p2)?;
    info!("File {} finished", fn_p2);

    info!(
        "Expected intersection size: {}, sum: {}",
        data.expected_size, data.expected_sum
    );
    Ok(())
}
