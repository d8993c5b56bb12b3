use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{bail, Error};
use clap::{value_t, values_t, App, AppSettings, Arg, ArgMatches};
use log::{error, info, warn};

use bddsat::{
    Bucket, Linear, Outcome, ProofFormat, Schedule, Scripted, Solver, SolverConfig,
    SolverConfigUpdate, Strategy, VarOrder,
};

mod logging;

use logging::{banner, init_logging, verbosity_filter};

fn main() {
    let exit_code = match main_with_err() {
        Err(err) => {
            error!("{}", err);
            1
        }
        Ok(exit_code) => exit_code,
    };
    std::process::exit(exit_code);
}

fn main_with_err() -> Result<i32, Error> {
    main_with_args(std::env::args_os())
}

fn main_with_args<I, T>(args: I) -> Result<i32, Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = App::new("bddsat")
        .version(env!("BDDSAT_VERSION"))
        .setting(AppSettings::DisableHelpSubcommand)
        .arg_from_usage("-b --bucket 'Use bucket elimination instead of linear conjunction'")
        .arg(
            Arg::from_usage("[verbosity] -v --verbosity=[LEVEL] 'Set the verbosity level'")
                .long_help(concat!(
                    "Set the verbosity level. 0: errors only, 1: statistics, ",
                    "2: comments in textual proofs, 3: proof operations, 4: node creation",
                ))
                .default_value("1"),
        )
        .arg_from_usage("[input] -i --input=[CNF] 'The input file to use (stdin if omitted)'")
        .arg_from_usage(
            "[output] -o --output=[FILE] \
             'Write the proof to FILE, the extension .proof, .lrat or .lratb selects the format'",
        )
        .arg(
            Arg::from_usage(
                "[pipe] -m --pipe=[FORMAT] \
                 'Write the proof to stdout: t for LRAT, b for binary LRAT, p for tracecheck'",
            )
            .possible_values(&["t", "b", "p"])
            .conflicts_with("output"),
        )
        .arg_from_usage("[order] -p --order=[FILE] 'Read a variable order permutation'")
        .arg(
            Arg::from_usage("[schedule] -s --schedule=[FILE] 'Follow a conjunction schedule'")
                .conflicts_with("bucket"),
        )
        .arg_from_usage("[log-file] -L --log=[FILE] 'Also append log output to FILE'")
        .arg_from_usage("-n --no-quantify 'Ignore quantification instructions of the schedule'")
        .arg_from_usage("[config-file] --config=[FILE] 'Read parameters from configuration file'")
        .arg(
            Arg::from_usage("[config-option] -C --config-option")
                .value_name("OPTION>=<VALUE")
                .help("Specify a single config option, see 'bddsat -C help' for a list of options.")
                .multiple(true)
                .number_of_values(1),
        )
        .get_matches_from_safe(args)
        .unwrap_or_else(|err| err.exit());

    let config_options = values_t!(matches, "config-option", String).unwrap_or_default();

    if config_options.iter().any(|option| option == "help") {
        print!("{}", SolverConfig::help());
        return Ok(0);
    }

    let verbosity = value_t!(matches, "verbosity", u64)?;
    init_logging(
        verbosity_filter(verbosity),
        matches.value_of("log-file").map(Path::new),
    )?;
    banner("bddsat");

    let mut config_update = SolverConfigUpdate::new();

    if verbosity >= 2 {
        config_update.proof_comments = Some(true);
    }

    if let Some(config_path) = matches.value_of("config-file") {
        let mut config_contents = String::new();
        fs::File::open(config_path)?.read_to_string(&mut config_contents)?;

        config_update.merge(toml::from_str(&config_contents)?);
    }

    for config_option in config_options {
        config_update.merge(toml::from_str(&config_option)?);
    }

    let mut solver = Solver::new();
    solver.config(&config_update);

    let proof_to_stdout = matches.is_present("pipe");

    if let Some(code) = matches.value_of("pipe") {
        let format = match ProofFormat::from_code(code) {
            Some(format) => format,
            None => bail!("Unknown proof format '{}'", code),
        };
        info!("Writing {:?} proof to stdout", format);
        solver.write_proof(io::stdout(), format);
    } else if let Some(path) = matches.value_of("output") {
        let format = match ProofFormat::from_path(path) {
            Some(format) => format,
            None => bail!(
                "Cannot determine proof format of '{}', use .proof, .lrat or .lratb",
                path
            ),
        };
        info!("Writing {:?} proof to file '{}'", format, path);
        solver.write_proof(fs::File::create(path)?, format);
    }

    let solved = load_and_solve(&mut solver, &matches).and_then(|outcome| {
        solver.close_proof()?;
        Ok(outcome)
    });

    let outcome = match solved {
        Ok(outcome) => outcome,
        Err(err) => {
            discard_proof(&mut solver, matches.value_of("output"));
            return Err(err);
        }
    };

    let mut result_lines = vec![];
    let exit_code = match outcome {
        Outcome::Unsat => {
            result_lines.push("s UNSATISFIABLE".to_owned());
            20
        }
        Outcome::Sat => {
            result_lines.push("s SATISFIABLE".to_owned());
            if let Some(model) = solver.model() {
                let mut line = "v".to_owned();
                for lit in model {
                    line.push_str(&format!(" {}", lit));
                }
                line.push_str(" 0");
                result_lines.push(line);
            }
            10
        }
        Outcome::Incomplete => {
            result_lines.push("s UNKNOWN".to_owned());
            0
        }
    };

    if proof_to_stdout {
        let stderr = io::stderr();
        let mut stderr = stderr.lock();
        for line in result_lines {
            writeln!(stderr, "{}", line)?;
        }
    } else {
        let stdout = io::stdout();
        let mut stdout = stdout.lock();
        for line in result_lines {
            writeln!(stdout, "{}", line)?;
        }
    }

    Ok(exit_code)
}

/// Read the order, the schedule and the formula, then run the selected strategy.
fn load_and_solve(solver: &mut Solver, matches: &ArgMatches) -> Result<Outcome, Error> {
    if let Some(path) = matches.value_of("order") {
        info!("Reading variable order from '{}'", path);
        solver.set_order(VarOrder::parse(fs::File::open(path)?)?)?;
    }

    let mut strategy: Box<dyn Strategy> = if let Some(path) = matches.value_of("schedule") {
        info!("Reading schedule from '{}'", path);
        let mut schedule = Schedule::parse(fs::File::open(path)?)?;
        if matches.is_present("no-quantify") {
            schedule = schedule.without_quantification();
        }
        Box::new(Scripted::new(schedule))
    } else if matches.is_present("bucket") {
        Box::new(Bucket)
    } else {
        Box::new(Linear)
    };

    match matches.value_of("input") {
        Some(path) => {
            info!("Reading file '{}'", path);
            solver.add_dimacs_cnf(fs::File::open(path)?)?;
        }
        None => {
            info!("Reading from stdin");
            let stdin = io::stdin();
            let locked_stdin = stdin.lock();
            solver.add_dimacs_cnf(locked_stdin)?;
        }
    }

    Ok(solver.solve(strategy.as_mut())?)
}

/// Stop writing the proof and remove the proof file of a failed run.
fn discard_proof(solver: &mut Solver, path: Option<&str>) {
    if let Err(err) = solver.close_proof() {
        warn!("{}", err);
    }
    if let Some(path) = path {
        match fs::remove_file(path) {
            Ok(()) => info!("Removed incomplete proof file '{}'", path),
            Err(err) => warn!("Could not remove incomplete proof file '{}': {}", path, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use tempfile::TempDir;

    fn run_files(cnf: &str, schedule: Option<&str>) -> (Result<i32, Error>, PathBuf, TempDir) {
        let tmp = TempDir::new().unwrap();
        let cnf_path = tmp.path().join("input.cnf");
        let proof_path = tmp.path().join("proof.lrat");
        fs::write(&cnf_path, cnf).unwrap();

        let mut args: Vec<OsString> = vec![
            "bddsat".into(),
            "-v".into(),
            "0".into(),
            "-i".into(),
            cnf_path.into(),
            "-o".into(),
            proof_path.clone().into(),
        ];
        if let Some(schedule) = schedule {
            let schedule_path = tmp.path().join("schedule");
            fs::write(&schedule_path, schedule).unwrap();
            args.push("-s".into());
            args.push(schedule_path.into());
        }

        (main_with_args(args), proof_path, tmp)
    }

    #[test]
    fn refutation_keeps_proof() {
        let (result, proof, _tmp) = run_files("p cnf 1 2\n1 0\n-1 0\n", None);
        assert_eq!(result.unwrap(), 20);
        assert!(fs::metadata(&proof).unwrap().len() > 0);
    }

    #[test]
    fn syntax_error_leaves_no_proof() {
        let (result, proof, _tmp) = run_files("p cnf 2 2\n1 2 0\nx 0\n", None);
        assert!(result.unwrap_err().to_string().contains("line 3"));
        assert!(!proof.exists());
    }

    #[test]
    fn schedule_error_leaves_no_proof() {
        let cnf = "p cnf 1 2\n1 0\n-1 0\n";

        let (result, proof, _tmp) = run_files(cnf, Some("c 1\na 2\n"));
        assert!(result.is_err());
        assert!(!proof.exists());

        let (result, proof, _tmp) = run_files(cnf, Some("c 1\nq 1\nc 2\na 1\n"));
        assert!(result.is_err());
        assert!(!proof.exists());
    }
}
