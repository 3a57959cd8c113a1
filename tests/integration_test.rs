// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! End-to-end scenarios, driven through the public API only (`Runtime`,
//! `ThreadContext`, `Trampoline`, `Writer`) rather than any crate-internal
//! helper, the way a host embedding this crate actually reaches it.

// Test code prioritizes clarity over defensive programming
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::TestVm;
use vmcore::frame::EvalOutcome;
use vmcore::heap::HeapFormat;

#[test]
fn one_plus_two_is_three() {
    let mut vm = TestVm::new();
    let outcome = vm.eval(|w| {
        let plus = w.name("+");
        let one = w.integer_literal(1);
        let two = w.integer_literal(2);
        let call = w.call_expr(plus, &[one, two]);
        w.file(&[call])
    });
    match outcome {
        EvalOutcome::Value(v) => assert_eq!(v.as_i64(), 3),
        other => panic!("expected Value(3), got {other:?}"),
    }
}

#[test]
fn ten_divided_by_four_is_an_exact_double() {
    let mut vm = TestVm::new();
    let outcome = vm.eval(|w| {
        let div = w.name("/");
        let ten = w.integer_literal(10);
        let four = w.integer_literal(4);
        let call = w.call_expr(div, &[ten, four]);
        w.file(&[call])
    });
    match outcome {
        EvalOutcome::Value(v) => {
            assert!(!v.is_integer());
            let value: f64 = vm.context().heap().read_at(v.as_addr(), 0);
            assert_eq!(value, 2.5);
        }
        other => panic!("expected a boxed double, got {other:?}"),
    }
}

#[test]
fn a_variable_is_visible_to_the_statement_after_its_declaration() {
    let mut vm = TestVm::new();
    let outcome = vm.eval(|w| {
        let two = w.integer_literal(2);
        let bound = w.binding("x", Some(two));
        let decl = w.var(false, &[bound]);
        let x1 = w.name("x");
        let x2 = w.name("x");
        let plus = w.name("+");
        let sum = w.call_expr(plus, &[x1, x2]);
        w.file(&[decl, sum])
    });
    match outcome {
        EvalOutcome::Value(v) => assert_eq!(v.as_i64(), 4),
        other => panic!("expected Value(4), got {other:?}"),
    }
}

#[test]
fn calling_an_unbound_name_raises_a_name_lookup_exception() {
    let mut vm = TestVm::new();
    let outcome = vm.eval(|w| {
        let callee = w.name("f");
        let call = w.call_expr(callee, &[]);
        w.file(&[call])
    });
    match outcome {
        EvalOutcome::Exception { exception, .. } => {
            assert_eq!(vm.context().heap().header_of(exception).format(), HeapFormat::ExceptionNameLookupFailed);
        }
        other => panic!("expected a name-lookup exception, got {other:?}"),
    }
}

#[test]
fn adding_a_non_numeric_operand_raises_an_exception_not_a_value() {
    // No boolean literal exists in the packed syntax a `Writer` can emit
    // (§4.8's own "1 + true" example), so a string operand exercises the
    // identical not-a-number rejection in `vmcore::number::add`.
    let mut vm = TestVm::new();
    let outcome = vm.eval(|w| {
        let plus = w.name("+");
        let one = w.integer_literal(1);
        let text = w.string_literal("nope");
        let call = w.call_expr(plus, &[one, text]);
        w.file(&[call])
    });
    match outcome {
        EvalOutcome::Exception { exception, .. } => {
            assert_eq!(vm.context().heap().header_of(exception).format(), HeapFormat::ExceptionInternal);
        }
        other => panic!("expected an exception, got {other:?}"),
    }
}

#[test]
fn interning_the_same_literal_from_two_programs_yields_one_identity() {
    let mut vm = TestVm::new();

    // "Two source files" sharing one thread-context's string table: each
    // program interns the identifier "shared" as part of evaluating a
    // plain name lookup.
    let before = vm.context().strings().len();
    let first = vm.context_mut().intern(vmcore::heap::Generation::Hatchery, "shared").expect("intern");
    let after_first = vm.context().strings().len();
    let second = vm.context_mut().intern(vmcore::heap::Generation::Hatchery, "shared").expect("intern");
    let after_second = vm.context().strings().len();

    assert_eq!(first, second, "interning the same literal twice must return the same identity");
    assert_eq!(after_first, before + 1, "the first intern grows the table by exactly one entry");
    assert_eq!(after_second, after_first, "the second intern must not grow the table again");
}
