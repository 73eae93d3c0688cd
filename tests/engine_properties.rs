use bfstep::{compile, BracketKind, CompileError, Engine, EngineError, Instruction, RunOutcome};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn capturing(source: &str) -> (Engine, Rc<RefCell<Vec<u8>>>) {
    let mut engine = Engine::from_source(source).expect("source should compile");
    let out = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&out);
    engine.set_output_sink(move |b| sink.borrow_mut().push(b));
    engine.set_input_provider(|| None);
    (engine, out)
}

#[test]
fn two_cells_printed_in_order() {
    let (mut engine, out) = capturing("++>+++<.>.");
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(*out.borrow(), vec![2, 3]);
}

#[test]
fn output_splits_runs() {
    let program = compile("+.+").unwrap();
    assert_eq!(
        program.instructions(),
        &[Instruction::Add(1), Instruction::Output, Instruction::Add(1)]
    );
}

#[test]
fn clear_loop_leaves_zero() {
    let (mut engine, _) = capturing("+[-]");
    engine.run().unwrap();
    assert!(engine.is_finished());
    assert_eq!(engine.peek(), 0);
}

#[test]
fn unbalanced_brackets_name_the_offender() {
    assert!(matches!(
        compile("[[]"),
        Err(CompileError::UnbalancedBracket { position: 0, kind: BracketKind::Open })
    ));
    assert!(matches!(
        compile("[]]"),
        Err(CompileError::UnbalancedBracket { position: 2, kind: BracketKind::Close })
    ));
}

#[test]
fn tape_grows_and_stops_at_left_edge() {
    let (mut engine, _) = capturing(&">".repeat(25));
    engine.run().unwrap();
    assert_eq!(engine.tape().cursor(), 25);
    assert!(engine.tape().len() > 25);

    let (mut engine, _) = capturing("<");
    let err = engine.run().unwrap_err();
    assert!(matches!(err, EngineError::OutOfBoundsLeft { ip: 0, cursor: 0, .. }));
}

#[test]
fn breakpoint_suspends_then_resumes() {
    let (mut engine, out) = capturing("+.+.+.");
    engine.set_breakpoint(3).unwrap();
    engine.set_debug_mode(true);

    assert_eq!(engine.run().unwrap(), RunOutcome::Breakpoint(3));
    assert_eq!(engine.program_cursor(), 3);
    assert_eq!(*out.borrow(), vec![1]);

    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(*out.borrow(), vec![1, 2, 3]);
}

#[test]
fn breakpoints_are_inert_outside_debug_mode() {
    let (mut engine, out) = capturing("+.!+.");
    assert_eq!(engine.run().unwrap(), RunOutcome::Finished);
    assert_eq!(*out.borrow(), vec![1, 2]);
}

fn straight_line() -> impl Strategy<Value = String> {
    // No '<' and no loops: every program terminates without a tape error.
    prop::collection::vec(prop::sample::select(vec!['+', '-', '>', '.', '!', ' ']), 0..64)
        .prop_map(|cs| cs.into_iter().collect::<String>())
}

proptest! {
    #[test]
    fn stepping_matches_running(src in straight_line()) {
        let (mut ran, ran_out) = capturing(&src);
        prop_assert_eq!(ran.run().unwrap(), RunOutcome::Finished);

        let (mut stepped, stepped_out) = capturing(&src);
        while !stepped.is_finished() {
            stepped.step().unwrap();
        }

        prop_assert_eq!(&*ran_out.borrow(), &*stepped_out.borrow());
        prop_assert_eq!(ran.tape(), stepped.tape());
        prop_assert_eq!(ran.steps(), stepped.steps());
        prop_assert_eq!(ran.steps() as usize, ran.program().len());
    }

    #[test]
    fn debug_run_visits_every_breakpoint(src in straight_line()) {
        let (mut engine, _) = capturing(&src);
        engine.set_debug_mode(true);
        let expected: Vec<usize> = engine.breakpoints().filter(|&bp| bp > 0).collect();

        let mut hits = Vec::new();
        loop {
            match engine.run().unwrap() {
                RunOutcome::Breakpoint(ip) => hits.push(ip),
                RunOutcome::Finished => break,
                RunOutcome::StepLimit => unreachable!(),
            }
        }
        prop_assert_eq!(hits, expected);
    }
}
