//! Checks the proofs generated by the solver using the LRAT checker.
use std::fs::File;
use std::io::Write;
use std::process::{Command, Stdio};

use proptest::prelude::*;
use tempfile::TempDir;

use bddsat::{
    dimacs::write_dimacs, Bucket, CnfFormula, Linear, Lit, Outcome, ProofFormat, Schedule,
    ScheduleError, Scripted, Solver, SolverConfigUpdate, SolverError, Strategy, Var, VarOrder,
};
use bddsat_checker::{Checker, CheckerError};
use bddsat_formula::{
    cnf_formula,
    test::{mutilated_chessboard, pigeon_hole, pigeon_tseitin, sat_formula, sgen_unsat_formula},
};

fn solve_with_proof(
    formula: &CnfFormula,
    order: Option<Vec<Var>>,
    strategy: &mut dyn Strategy,
    format: ProofFormat,
    config: &SolverConfigUpdate,
) -> (Outcome, Vec<u8>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut proof = vec![];
    let outcome = {
        let mut solver = Solver::new();
        solver.config(config);
        solver.write_proof(&mut proof, format);
        if let Some(order) = order {
            solver.set_order(VarOrder::from_vars(order).unwrap()).unwrap();
        }
        solver.add_formula(formula).unwrap();
        let outcome = solver.solve(strategy).unwrap();
        solver.close_proof().unwrap();
        outcome
    };
    (outcome, proof)
}

fn solve_lrat(formula: &CnfFormula, strategy: &mut dyn Strategy) -> (Outcome, Vec<u8>) {
    solve_with_proof(
        formula,
        None,
        strategy,
        ProofFormat::Lrat,
        &SolverConfigUpdate::new(),
    )
}

fn check(formula: &CnfFormula, proof: &[u8]) -> Result<Checker, CheckerError> {
    let mut checker = Checker::new();
    checker.add_formula(formula);
    checker.check_proof(proof)?;
    Ok(checker)
}

fn scripted(schedule: &str) -> Scripted {
    Scripted::new(Schedule::parse(schedule.as_bytes()).unwrap())
}

#[test]
fn satisfiable_formula_has_no_refutation() {
    let formula = cnf_formula![
        1, 2;
        -1, -2;
    ];
    let (outcome, proof) = solve_lrat(&formula, &mut Linear);
    assert_eq!(outcome, Outcome::Sat);

    match check(&formula, &proof) {
        Err(CheckerError::NotUnsat { .. }) => (),
        other => panic!("expected missing refutation but got {:?}", other.map(|_| ())),
    }
}

#[test]
fn chessboard_with_trivial_refutation() {
    let bench = mutilated_chessboard(2);
    let (outcome, proof) = solve_with_proof(
        &bench.formula,
        Some(bench.order),
        &mut scripted(&bench.schedule),
        ProofFormat::Lrat,
        &SolverConfigUpdate::new(),
    );
    assert_eq!(outcome, Outcome::Unsat);
    check(&bench.formula, &proof).unwrap();
}

#[test]
fn chessboard_column_schedule() {
    let bench = mutilated_chessboard(4);
    assert!(bench.formula.iter().all(|clause| !clause.is_empty()));

    let (outcome, proof) = solve_with_proof(
        &bench.formula,
        Some(bench.order),
        &mut scripted(&bench.schedule),
        ProofFormat::Lrat,
        &SolverConfigUpdate::new(),
    );
    assert_eq!(outcome, Outcome::Unsat);
    check(&bench.formula, &proof).unwrap();
}

#[test]
fn chessboard_without_quantification() {
    let bench = mutilated_chessboard(4);
    let schedule = Schedule::parse(bench.schedule.as_bytes())
        .unwrap()
        .without_quantification();

    let (outcome, proof) = solve_with_proof(
        &bench.formula,
        Some(bench.order),
        &mut Scripted::new(schedule),
        ProofFormat::Lrat,
        &SolverConfigUpdate::new(),
    );
    assert_eq!(outcome, Outcome::Unsat);
    check(&bench.formula, &proof).unwrap();
}

#[test]
fn pigeon_tseitin_linear() {
    let bench = pigeon_tseitin(2);
    let (outcome, proof) = solve_lrat(&bench.formula, &mut Linear);
    assert_eq!(outcome, Outcome::Unsat);
    check(&bench.formula, &proof).unwrap();
}

#[test]
fn pigeon_tseitin_schedule() {
    let bench = pigeon_tseitin(3);
    let (outcome, proof) = solve_with_proof(
        &bench.formula,
        Some(bench.order),
        &mut scripted(&bench.schedule),
        ProofFormat::Lrat,
        &SolverConfigUpdate::new(),
    );
    assert_eq!(outcome, Outcome::Unsat);
    check(&bench.formula, &proof).unwrap();
}

#[test]
fn pigeon_hole_direct_encoding() {
    let formula = pigeon_hole(3);
    let (outcome, proof) = solve_lrat(&formula, &mut Linear);
    assert_eq!(outcome, Outcome::Unsat);
    check(&formula, &proof).unwrap();

    let (outcome, proof) = solve_lrat(&formula, &mut Bucket);
    assert_eq!(outcome, Outcome::Unsat);
    check(&formula, &proof).unwrap();
}

#[test]
fn gc_keeps_proof_valid() {
    let bench = pigeon_tseitin(3);
    let mut config = SolverConfigUpdate::new();
    config.gc_threshold = Some(0);

    let (outcome, proof) = solve_with_proof(
        &bench.formula,
        Some(bench.order),
        &mut scripted(&bench.schedule),
        ProofFormat::Lrat,
        &config,
    );
    assert_eq!(outcome, Outcome::Unsat);

    let text = String::from_utf8(proof).unwrap();
    assert!(text.lines().any(|line| line.contains(" d ")));
    check(&bench.formula, text.as_bytes()).unwrap();
}

#[test]
fn proof_comments() {
    let formula = pigeon_hole(2);
    let mut config = SolverConfigUpdate::new();
    config.proof_comments = Some(true);

    let (outcome, proof) =
        solve_with_proof(&formula, None, &mut Linear, ProofFormat::Lrat, &config);
    assert_eq!(outcome, Outcome::Unsat);

    let text = String::from_utf8(proof).unwrap();
    assert!(text.lines().any(|line| line.starts_with("c T")));
    check(&formula, text.as_bytes()).unwrap();
}

#[test]
fn text_and_binary_proofs_agree() {
    let formula = pigeon_hole(2);

    let (_, text) = solve_lrat(&formula, &mut Bucket);
    let (_, binary) = solve_with_proof(
        &formula,
        None,
        &mut Bucket,
        ProofFormat::BinaryLrat,
        &SolverConfigUpdate::new(),
    );
    assert_ne!(text, binary);

    let text_checker = check(&formula, &text).unwrap();

    let mut binary_checker = Checker::new();
    binary_checker.add_formula(&formula);
    binary_checker
        .check_proof_with_encoding(&binary[..], true)
        .unwrap();

    assert_eq!(text_checker.steps(), binary_checker.steps());
}

#[test]
fn tracecheck_lists_input_clauses() {
    let formula = cnf_formula![
        1, 2;
        -1;
        -2;
    ];
    let (outcome, proof) = solve_with_proof(
        &formula,
        None,
        &mut Linear,
        ProofFormat::Tracecheck,
        &SolverConfigUpdate::new(),
    );
    assert_eq!(outcome, Outcome::Unsat);

    let text = String::from_utf8(proof).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(&lines[..3], &["1 1 2 0 0", "2 -1 0 0", "3 -2 0 0"]);
    assert!(lines.iter().all(|line| !line.contains(" d ")));
}

#[test]
fn tampered_proof_is_rejected() {
    let formula = pigeon_hole(2);
    let (_, proof) = solve_lrat(&formula, &mut Linear);
    let text = String::from_utf8(proof).unwrap();

    // drop the hints of the final empty clause
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    let last = lines
        .iter()
        .rposition(|line| line.split_whitespace().nth(1) == Some("0"))
        .unwrap();
    let id = lines[last].split_whitespace().next().unwrap().to_owned();
    lines[last] = format!("{} 0 0", id);
    let tampered = lines.join("\n") + "\n";

    match check(&formula, tampered.as_bytes()) {
        Err(CheckerError::CheckFailed { id: err_id, .. }) => {
            assert_eq!(err_id.to_string(), id);
        }
        other => panic!("expected failed check but got {:?}", other.map(|_| ())),
    }
}

#[test]
fn schedule_underflow() {
    let formula = pigeon_hole(2);
    let mut solver = Solver::new();
    solver.add_formula(&formula).unwrap();

    match solver.solve(&mut scripted("c 1\na 2\n")) {
        Err(SolverError::Schedule(err)) => {
            match err {
                ScheduleError::StackUnderflow {
                    count: 2,
                    available: 1,
                    ..
                } => (),
                ref other => panic!("unexpected schedule error {}", other),
            }
            assert!(err
                .to_string()
                .contains("Invalid conjunction count 2. Only have 1 on stack"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn quantifying_a_shared_variable_is_rejected() {
    let formula = cnf_formula![
        1;
        -1;
    ];
    let mut solver = Solver::new();
    solver.add_formula(&formula).unwrap();

    match solver.solve(&mut scripted("c 1\nq 1\nc 2\na 1\n")) {
        Err(SolverError::Schedule(ScheduleError::VariableInUse { line: 2, var: 1, .. })) => (),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(solver.outcome(), None);
}

#[test]
fn model_satisfies_unquantified_formula() {
    let formula = cnf_formula![
        -1, 2;
        -2, 3;
        1;
    ];
    let mut solver = Solver::new();
    solver.add_formula(&formula).unwrap();
    assert_eq!(solver.solve(&mut Linear).unwrap(), Outcome::Sat);
    assert_eq!(
        solver.model().unwrap(),
        vec![
            Lit::from_dimacs(1),
            Lit::from_dimacs(2),
            Lit::from_dimacs(3),
        ]
    );
}

proptest! {
    #[test]
    fn sgen_unsat_linear(formula in sgen_unsat_formula(1..5usize)) {
        let (outcome, proof) = solve_lrat(&formula, &mut Linear);
        prop_assert_eq!(outcome, Outcome::Unsat);

        let mut dimacs = vec![];
        write_dimacs(&mut dimacs, &formula).unwrap();

        let mut checker = Checker::new();
        checker.add_dimacs_cnf(&dimacs[..]).unwrap();
        checker.check_proof(&proof[..]).unwrap();
    }

    #[test]
    fn sgen_unsat_bucket_binary(formula in sgen_unsat_formula(1..5usize)) {
        let (outcome, proof) = solve_with_proof(
            &formula,
            None,
            &mut Bucket,
            ProofFormat::BinaryLrat,
            &SolverConfigUpdate::new(),
        );
        prop_assert_eq!(outcome, Outcome::Unsat);
        check(&formula, &proof).unwrap();
    }

    #[test]
    fn sgen_unsat_eager_gc(formula in sgen_unsat_formula(1..4usize)) {
        let mut config = SolverConfigUpdate::new();
        config.gc_threshold = Some(0);

        let (outcome, proof) =
            solve_with_proof(&formula, None, &mut Bucket, ProofFormat::Lrat, &config);
        prop_assert_eq!(outcome, Outcome::Unsat);
        check(&formula, &proof).unwrap();
    }

    #[test]
    fn sat_without_refutation(
        formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0),
    ) {
        let (outcome, proof) = solve_lrat(&formula, &mut Bucket);
        prop_assert_eq!(outcome, Outcome::Sat);

        match check(&formula, &proof) {
            Err(CheckerError::NotUnsat { .. }) => (),
            other => panic!("expected missing refutation but got {:?}", other.map(|_| ())),
        }
    }

    #[cfg_attr(not(test_lrat_check), ignore)]
    #[test]
    fn sgen_unsat_lrat_check(formula in sgen_unsat_formula(1..7usize)) {
        let tmp = TempDir::new()?;

        let cnf_file = tmp.path().join("input.cnf");
        let proof_file = tmp.path().join("proof.lrat");

        write_dimacs(&mut File::create(&cnf_file)?, &formula)?;

        let (outcome, proof) = solve_lrat(&formula, &mut Linear);
        prop_assert_eq!(outcome, Outcome::Unsat);
        File::create(&proof_file)?.write_all(&proof)?;

        let output = Command::new("lrat-check")
            .arg(&cnf_file)
            .arg(&proof_file)
            .stdin(Stdio::null())
            .output()?;

        prop_assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        prop_assert!(stdout.contains("s VERIFIED"));
    }
}
