use std::fs;
use std::io::BufReader;
use std::path::Path;

use anyhow::Error;
use clap::{value_t, App, AppSettings, Arg, ArgGroup};
use log::{error, info};

use bddsat_checker::{Checker, CheckerError};

mod logging;

use logging::{banner, init_logging, verbosity_filter};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            println!("s NOT VERIFIED");
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn main_with_err() -> Result<i32, Error> {
    let matches = App::new("lrat-check")
        .version(env!("BDDSAT_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("<CNF> 'The formula in DIMACS CNF format'")
        .arg_from_usage("<PROOF> 'The LRAT proof to check'")
        .arg_from_usage("--binary 'Read the proof as binary LRAT'")
        .arg_from_usage("--text 'Read the proof as textual LRAT'")
        .group(ArgGroup::with_name("encoding").args(&["binary", "text"]))
        .arg(
            Arg::from_usage("[verbosity] -v --verbosity=[LEVEL] 'Set the verbosity level'")
                .default_value("1"),
        )
        .arg_from_usage("[log-file] -L --log=[FILE] 'Also append log output to FILE'")
        .get_matches();

    let verbosity = value_t!(matches, "verbosity", u64)?;
    init_logging(
        verbosity_filter(verbosity),
        matches.value_of("log-file").map(Path::new),
    )?;
    banner("lrat-check");

    let mut checker = Checker::new();

    let cnf_path = matches.value_of("CNF").unwrap_or_default();
    info!("Reading file '{}'", cnf_path);
    checker.add_dimacs_cnf(fs::File::open(cnf_path)?)?;

    let proof_path = matches.value_of("PROOF").unwrap_or_default();
    info!("Checking proof file '{}'", proof_path);
    let proof = BufReader::new(fs::File::open(proof_path)?);

    let result = if matches.is_present("binary") {
        checker.check_proof_with_encoding(proof, true)
    } else if matches.is_present("text") {
        checker.check_proof_with_encoding(proof, false)
    } else {
        checker.check_proof(proof)
    };

    match result {
        Ok(()) => {
            println!("s VERIFIED");
            Ok(0)
        }
        Err(err) => {
            error!("{}", err);
            if let CheckerError::NotUnsat { steps } = err {
                info!("The empty clause was not derived in {} steps", steps);
            }
            println!("s NOT VERIFIED");
            Ok(1)
        }
    }
}
