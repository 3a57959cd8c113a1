// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Tests for the frame-based evaluator.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::config::RuntimeConfig;
use crate::context::Runtime;
use crate::heap::HeapSizes;
use crate::syntax::Writer;

fn tiny_config() -> RuntimeConfig {
    RuntimeConfig {
        heap_sizes: HeapSizes { hatchery: 256 * 1024, local_heap: 256 * 1024, tenured: 256 * 1024 },
        string_table_capacity: 32,
        default_dict_capacity: 8,
    }
}

fn eval(writer: Writer, root: u32) -> (crate::context::ThreadContext, EvalOutcome) {
    let runtime = Runtime::new(tiny_config());
    let mut context = runtime.new_thread_context(0).unwrap();
    let tree = {
        let heap = context.heap_mut();
        writer.finish(heap, Generation::Hatchery, root).unwrap()
    };
    let scope = context.global_scope();
    let mut res = context.frame_resources();
    let outcome = Trampoline::run(&mut res, scope, tree, root).unwrap();
    drop(res);
    (context, outcome)
}

#[test]
fn one_plus_two_evaluates_to_three() {
    let mut writer = Writer::new();
    let plus = writer.name("+");
    let one = writer.integer_literal(1);
    let two = writer.integer_literal(2);
    let call = writer.call_expr(plus, &[one, two]);
    let file = writer.file(&[call]);
    let (_context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Value(v) => assert_eq!(v.as_i64(), 3),
        other => panic!("expected Value(3), got {other:?}"),
    }
}

#[test]
fn ten_divided_by_four_promotes_to_a_double() {
    let mut writer = Writer::new();
    let div = writer.name("/");
    let ten = writer.integer_literal(10);
    let four = writer.integer_literal(4);
    let call = writer.call_expr(div, &[ten, four]);
    let file = writer.file(&[call]);
    let (context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Value(v) => {
            assert!(!v.is_integer());
            let addr = v.as_addr();
            let value: f64 = context.heap().read_at(addr, 0);
            assert_eq!(value, 2.5);
        }
        other => panic!("expected a boxed double, got {other:?}"),
    }
}

#[test]
fn a_declared_variable_is_visible_to_a_later_statement() {
    let mut writer = Writer::new();
    let two = writer.integer_literal(2);
    let bound = writer.binding("x", Some(two));
    let decl = writer.var(false, &[bound]);
    let x1 = writer.name("x");
    let x2 = writer.name("x");
    let plus = writer.name("+");
    let sum = writer.call_expr(plus, &[x1, x2]);
    let file = writer.file(&[decl, sum]);
    let (_context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Value(v) => assert_eq!(v.as_i64(), 4),
        other => panic!("expected Value(4), got {other:?}"),
    }
}

#[test]
fn calling_an_unbound_name_throws_a_name_lookup_failure() {
    let mut writer = Writer::new();
    let callee = writer.name("f");
    let call = writer.call_expr(callee, &[]);
    let file = writer.file(&[call]);
    let (context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Exception { exception, .. } => {
            assert_eq!(context.heap().header_of(exception).format(), HeapFormat::ExceptionNameLookupFailed);
        }
        other => panic!("expected a name-lookup exception, got {other:?}"),
    }
}

#[test]
fn adding_a_string_throws_a_type_exception() {
    // No boolean-literal syntax exists to exercise "1 + true" directly
    // (§4.8's example); a string operand exercises the same
    // not-a-number rejection in `crate::number::add`.
    let mut writer = Writer::new();
    let plus = writer.name("+");
    let one = writer.integer_literal(1);
    let text = writer.string_literal("nope");
    let call = writer.call_expr(plus, &[one, text]);
    let file = writer.file(&[call]);
    let (context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Exception { exception, .. } => {
            assert_eq!(context.heap().header_of(exception).format(), HeapFormat::ExceptionInternal);
        }
        other => panic!("expected an internal type exception, got {other:?}"),
    }
}

#[test]
fn an_empty_file_evaluates_to_void() {
    let mut writer = Writer::new();
    let file = writer.file(&[]);
    let (_context, outcome) = eval(writer, file);
    assert!(matches!(outcome, EvalOutcome::Void));
}

#[test]
fn a_string_literal_evaluates_to_a_managed_string() {
    let mut writer = Writer::new();
    let lit = writer.string_literal("hi");
    let file = writer.file(&[lit]);
    let (context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Value(v) => {
            assert!(v.is_pointer());
            assert_eq!(string::to_string(context.heap(), v.as_addr()), "hi");
        }
        other => panic!("expected a string value, got {other:?}"),
    }
}

#[test]
fn apply_invokes_its_target_and_resumes_with_the_result() {
    let mut writer = Writer::new();
    let apply = writer.name("apply");
    let plus = writer.name("+");
    let two = writer.integer_literal(2);
    let three = writer.integer_literal(3);
    let call = writer.call_expr(apply, &[plus, two, three]);
    let file = writer.file(&[call]);
    let (_context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Value(v) => assert_eq!(v.as_i64(), 5),
        other => panic!("expected Value(5), got {other:?}"),
    }
}

#[test]
fn apply_with_a_non_function_target_throws() {
    let mut writer = Writer::new();
    let apply = writer.name("apply");
    let one = writer.integer_literal(1);
    let two = writer.integer_literal(2);
    let call = writer.call_expr(apply, &[one, two]);
    let file = writer.file(&[call]);
    let (context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Exception { exception, .. } => {
            assert_eq!(context.heap().header_of(exception).format(), HeapFormat::ExceptionInternal);
        }
        other => panic!("expected an internal exception, got {other:?}"),
    }
}

#[test]
fn nested_blocks_get_their_own_scope() {
    let mut writer = Writer::new();
    let one = writer.integer_literal(1);
    let bound = writer.binding("x", Some(one));
    let decl = writer.var(false, &[bound]);
    let inner_x = writer.name("x");
    let block = writer.block(&[decl, inner_x]);
    let file = writer.file(&[block]);
    let (_context, outcome) = eval(writer, file);
    match outcome {
        EvalOutcome::Value(v) => assert_eq!(v.as_i64(), 1),
        other => panic!("expected Value(1), got {other:?}"),
    }
}
