use std::cell::RefCell;
use std::fmt::Write as _;
use std::io;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use test_env_log::test;

use crate::{Error, Exit, Vm, VmConfig};

/// An output sink that can still be inspected after the vm took it.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    fn take(&self) -> String {
        String::from_utf8(std::mem::take(&mut *self.0.borrow_mut())).expect("utf-8 output")
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Evaluate each non-empty line at the top level and record `> input` followed
/// by the printed result.
fn transcript(vm: &mut Vm, input: &str) -> String {
    let mut out = String::new();
    for line in input.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let res = match vm.eval_top_level(line) {
            Ok(val) => vm.write_to_string(val),
            Err(Exit(code)) => format!("<exit {}>", code),
        };
        writeln!(out, "> {}\n{}", line, res).unwrap();
    }
    out
}

fn assert_transcript(vm: &mut Vm, input: &str, expected: &str) {
    let result = transcript(vm, input);
    let actual = result.trim();
    let expected = expected
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if actual != expected {
        let diff = colored_diff::PrettyDifference {
            actual,
            expected: &expected,
        };
        panic!("transcript mismatch (< expected / > actual):\n{}", diff);
    }
}

#[test]
fn test_arithmetic() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (+ 1 2)
        (+)
        (*)
        (- 5)
        (- 10 1 2)
        (/ 1 3)
        (/ 6 3)
        (/ 2)
        (+ 1/2 1/2)
        (* 2/3 3/4)
        (+ 1/2 0.5)
        (* 99999999999 99999999999)
        (mod -7 3)
        (mod 7 -3)
        (/ 5 0)
        (mod 5 0)
        (mod 5 1.5)
        (+ 1 "a")
        "#,
        r#"
        > (+ 1 2)
        3
        > (+)
        0
        > (*)
        1
        > (- 5)
        -5
        > (- 10 1 2)
        7
        > (/ 1 3)
        1/3
        > (/ 6 3)
        2
        > (/ 2)
        2
        > (+ 1/2 1/2)
        1
        > (* 2/3 3/4)
        1/2
        > (+ 1/2 0.5)
        1.0
        > (* 99999999999 99999999999)
        9999999999800000000001
        > (mod -7 3)
        2
        > (mod 7 -3)
        -2
        > (/ 5 0)
        Error: division by zero
        > (mod 5 0)
        Error: division by zero
        > (mod 5 1.5)
        Error: argument to mod is not of type integer, got number
        > (+ 1 "a")
        Error: argument to + is not of type number, got string
        "#,
    );
}

#[test]
fn test_comparisons_and_predicates() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (< 1 2)
        (>= 1/2 0.5)
        (= 1 1.0)
        (> 1 2 3)
        (null? '())
        (null? '(1))
        (pair? '(1))
        (list? '(1 2))
        (list? '(1 . 2))
        (integer? 1/2)
        (number? 1/2)
        (symbol? 'a)
        (string? "a")
        (boolean? false)
        (char? (int->char 97))
        (vector? (make-vector 1))
        (procedure? car)
        (procedure? (lambda () 1))
        (procedure? 'car)
        "#,
        r#"
        > (< 1 2)
        true
        > (>= 1/2 0.5)
        true
        > (= 1 1.0)
        true
        > (> 1 2 3)
        Error: incorrect number of arguments to >. expected 2, got 3
        > (null? '())
        true
        > (null? '(1))
        false
        > (pair? '(1))
        true
        > (list? '(1 2))
        true
        > (list? '(1 . 2))
        false
        > (integer? 1/2)
        false
        > (number? 1/2)
        true
        > (symbol? 'a)
        true
        > (string? "a")
        true
        > (boolean? false)
        true
        > (char? (int->char 97))
        true
        > (vector? (make-vector 1))
        true
        > (procedure? car)
        true
        > (procedure? (lambda () 1))
        true
        > (procedure? 'car)
        false
        "#,
    );
}

#[test]
fn test_eq() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (eq? 1 1.0)
        (eq? 'a 'a)
        (eq? "a" "a")
        (eq? '() nil)
        (eq? (cons 1 2) (cons 1 2))
        (define p (cons 1 2))
        (eq? p p)
        (eq? (int->char 65) (int->char 65))
        (eq? 1 'a)
        "#,
        r#"
        > (eq? 1 1.0)
        true
        > (eq? 'a 'a)
        true
        > (eq? "a" "a")
        false
        > (eq? '() nil)
        true
        > (eq? (cons 1 2) (cons 1 2))
        false
        > (define p (cons 1 2))
        ()
        > (eq? p p)
        true
        > (eq? (int->char 65) (int->char 65))
        true
        > (eq? 1 'a)
        false
        "#,
    );
}

#[test]
fn test_pairs_and_vectors() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (define l (list 1 2 3))
        (car (cdr l))
        (set-car! l 10)
        l
        (set-cdr! (cdr (cdr l)) 4)
        l
        (car '())
        (define v (make-vector 3 'x))
        (vector-set! v 0 1/2)
        v
        (vector-ref v 0)
        (vector-length v)
        (vector-ref v 3)
        (vector-ref v -1)
        (vector-ref v 'a)
        (make-vector -1)
        (make-vector 2)
        "#,
        r#"
        > (define l (list 1 2 3))
        ()
        > (car (cdr l))
        2
        > (set-car! l 10)
        ()
        > l
        (10 2 3)
        > (set-cdr! (cdr (cdr l)) 4)
        ()
        > l
        (10 2 3 . 4)
        > (car '())
        Error: argument to car is not of type pair, got nil
        > (define v (make-vector 3 'x))
        ()
        > (vector-set! v 0 1/2)
        ()
        > v
        #(1/2 x x)
        > (vector-ref v 0)
        1/2
        > (vector-length v)
        3
        > (vector-ref v 3)
        Error: index 3 out of bounds in 'vector-ref' (length 3)
        > (vector-ref v -1)
        Error: index -1 out of bounds in 'vector-ref' (length 3)
        > (vector-ref v 'a)
        Error: argument to vector-ref is not of type integer, got symbol
        > (make-vector -1)
        Error: argument to make-vector is not of type non-negative integer, got integer
        > (make-vector 2)
        #(0 0)
        "#,
    );
}

#[test]
fn test_conversions_and_strings() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (char->int (int->char 65))
        (int->char 97)
        (int->char -1)
        (number->string 1/2)
        (string->number "12")
        (string->number "-1.5")
        (string->number "x")
        (symbol->string 'abc)
        (string->symbol "abc")
        (string-append "a" "b" "c")
        (string-append)
        (string-append "a" 1)
        "#,
        r#"
        > (char->int (int->char 65))
        65
        > (int->char 97)
        #\a
        > (int->char -1)
        Error: argument to int->char is not of type character code, got integer
        > (number->string 1/2)
        "1/2"
        > (string->number "12")
        12
        > (string->number "-1.5")
        -1.5
        > (string->number "x")
        Error: syntax error: invalid number syntax 'x'
        > (symbol->string 'abc)
        "abc"
        > (string->symbol "abc")
        abc
        > (string-append "a" "b" "c")
        "abc"
        > (string-append)
        ""
        > (string-append "a" 1)
        Error: argument to string-append is not of type string, got number
        "#,
    );
}

#[test]
fn test_environment_semantics() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (define x 1)
        (define f (lambda (x) (begin (define x 2) x)))
        (f 5)
        x
        (define g (lambda () (set! x 3)))
        (g)
        x
        (define counter (lambda () (begin (define n 0) (lambda () (begin (set! n (+ n 1)) n)))))
        (define c (counter))
        (c)
        (c)
        (set! undefined 1)
        "#,
        r#"
        > (define x 1)
        ()
        > (define f (lambda (x) (begin (define x 2) x)))
        ()
        > (f 5)
        2
        > x
        1
        > (define g (lambda () (set! x 3)))
        ()
        > (g)
        ()
        > x
        3
        > (define counter (lambda () (begin (define n 0) (lambda () (begin (set! n (+ n 1)) n)))))
        ()
        > (define c (counter))
        ()
        > (c)
        1
        > (c)
        2
        > (set! undefined 1)
        Error: unbound symbol 'undefined'
        "#,
    );
}

#[test]
fn test_error_propagation() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (+ 1 (car '()))
        (list 1 (raise "boom") (undefined))
        (car 1 2)
        ((lambda (a b) a) 1)
        (5 6)
        ("f")
        "#,
        r#"
        > (+ 1 (car '()))
        Error: argument to car is not of type pair, got nil
        > (list 1 (raise "boom") (undefined))
        Error: boom
        > (car 1 2)
        Error: incorrect number of arguments to car. expected 1, got 2
        > ((lambda (a b) a) 1)
        Error: incorrect number of arguments to lambda. expected 2, got 1
        > (5 6)
        Error: first object in list is not a function, got number
        > ("f")
        Error: first object in list is not a function, got string
        "#,
    );
    assert!(vm.heap().stack().is_empty());
}

#[test]
fn test_errors_are_values() {
    let mut vm = Vm::new();
    let err = vm.eval_top_level("(raise \"oops\")").unwrap();
    assert_eq!(vm.as_error(err), Some(&Error::UserRaised("oops".into())));

    // a syntax error in a later form keeps the effects of the earlier ones
    vm.eval_top_level("(define a 1) (define b").unwrap();
    assert_eq!(transcript(&mut vm, "a").trim(), "> a\n1");
}

#[test]
fn test_display_output() {
    let buf = SharedBuf::default();
    let mut vm = Vm::new().with_output(buf.clone());
    vm.eval_str(r#"(display "hello" 'world 1/2 (list "a" (int->char 98)))"#)
        .unwrap();
    vm.eval_str(r#"(display "line\ttab")"#).unwrap();
    expect_test::expect![[r#"
        hello world 1/2 (a b)
        line	tab
    "#]]
    .assert_eq(&buf.take());
}

#[test]
fn test_exit() {
    let mut vm = Vm::new();
    assert_eq!(vm.eval_top_level("(exit)"), Err(Exit(0)));
    assert_eq!(vm.eval_top_level("(exit 3)"), Err(Exit(3)));
    assert_eq!(
        vm.eval_top_level("((lambda () (begin (exit 4) 1)))"),
        Err(Exit(4))
    );
    // exit stops the rest of the input
    assert_eq!(
        vm.eval_top_level("(define z 1) (exit 5) (define z 2)"),
        Err(Exit(5))
    );
    assert_eq!(transcript(&mut vm, "z").trim(), "> z\n1");
    assert_eq!(
        transcript(&mut vm, "(exit 'a)").trim(),
        "> (exit 'a)\nError: argument to exit is not of type integer, got symbol"
    );
    assert!(vm.heap().stack().is_empty());
}

#[test]
fn test_load_file() {
    let path = std::env::temp_dir().join(format!("fig-load-test-{}.fig", std::process::id()));
    std::fs::write(
        &path,
        "(define square (lambda (x) (* x x)))\n(define nine (square 3))\n'done\n",
    )
    .unwrap();

    let mut vm = Vm::new();
    let res = vm.load_file(&path).unwrap();
    assert_eq!(vm.write_to_string(res), "done");
    assert_eq!(transcript(&mut vm, "nine").trim(), "> nine\n9");

    let src = format!("(load {:?})", path.display().to_string());
    assert_eq!(
        vm.eval_str(&src).map(|v| vm.write_to_string(v)),
        Ok("done".into())
    );
    std::fs::remove_file(&path).unwrap();

    assert!(matches!(vm.load_file(&path), Err(Error::Load { .. })));
}

#[test]
fn test_oversized_vector_is_an_error() {
    let mut vm = Vm::new();
    assert_transcript(
        &mut vm,
        r#"
        (make-vector 1000000000000000000)
        (make-vector 100000000000000000000 'x)
        (make-vector -1)
        (vector-length (make-vector 3))
        "#,
        r#"
        > (make-vector 1000000000000000000)
        Error: cannot allocate 1000000000000000000 elements in 'make-vector'
        > (make-vector 100000000000000000000 'x)
        Error: cannot allocate 100000000000000000000 elements in 'make-vector'
        > (make-vector -1)
        Error: argument to make-vector is not of type non-negative integer, got integer
        > (vector-length (make-vector 3))
        3
        "#,
    );
}

#[test]
fn test_standard_library() {
    let mut vm = Vm::new();
    vm.load_file(concat!(env!("CARGO_MANIFEST_DIR"), "/../../lib/lib.fig"))
        .unwrap();
    assert_transcript(
        &mut vm,
        r#"
        (length '(1 2 3))
        (map (lambda (x) (* x x)) '(1 2 3))
        (filter (lambda (x) (> x 1)) '(1 2 3))
        (foldl + 0 '(1 2 3 4))
        (append '(1) '(2 3))
        (reverse '(1 2 3))
        (list-ref '(a b c) 2)
        (cadr '(1 2))
        (not false)
        (not 0)
        (abs -3)
        "#,
        r#"
        > (length '(1 2 3))
        3
        > (map (lambda (x) (* x x)) '(1 2 3))
        (1 4 9)
        > (filter (lambda (x) (> x 1)) '(1 2 3))
        (2 3)
        > (foldl + 0 '(1 2 3 4))
        10
        > (append '(1) '(2 3))
        (1 2 3)
        > (reverse '(1 2 3))
        (3 2 1)
        > (list-ref '(a b c) 2)
        c
        > (cadr '(1 2))
        2
        > (not false)
        true
        > (not 0)
        false
        > (abs -3)
        3
        "#,
    );
}

#[test]
fn test_round_trip() {
    let mut vm = Vm::new();
    for src in [
        "42",
        "-17",
        "3/4",
        "2.5",
        "123456789012345678901234567890",
        "\"tab\\there \\\"quoted\\\" \\\\ done\\n\"",
        "sym",
        "()",
        "true",
        "(1 (2 \"x\" (3 . 4)) () . end)",
        "(quote (a b))",
    ] {
        let val = vm.eval_str(&format!("'{}", src)).unwrap();
        let printed = vm.write_to_string(val);
        let reread = vm.eval_str(&format!("'{}", printed)).unwrap();
        assert_eq!(vm.write_to_string(reread), printed, "round trip of {}", src);
    }
}

#[test]
fn test_collect_every_allocation() {
    let mut vm = Vm::with_config(VmConfig {
        gc_stress: true,
        ..VmConfig::default()
    });
    assert_transcript(
        &mut vm,
        r#"
        (define build (lambda (n) (cond ((= n 0) '()) (true (cons (list n (* n n)) (build (- n 1)))))))
        (build 5)
        (define fact (lambda (n) (if ((< n 2) 1) (true (* n (fact (- n 1)))))))
        (fact 20)
        (define v (make-vector 3 (list 1 2)))
        (vector-set! v 1 (string-append "a" "b"))
        v
        '(1 (2 . 3) "s" . 4)
        "#,
        r#"
        > (define build (lambda (n) (cond ((= n 0) '()) (true (cons (list n (* n n)) (build (- n 1)))))))
        ()
        > (build 5)
        ((5 25) (4 16) (3 9) (2 4) (1 1))
        > (define fact (lambda (n) (if ((< n 2) 1) (true (* n (fact (- n 1)))))))
        ()
        > (fact 20)
        2432902008176640000
        > (define v (make-vector 3 (list 1 2)))
        ()
        > (vector-set! v 1 (string-append "a" "b"))
        ()
        > v
        #((1 2) "ab" (1 2))
        > '(1 (2 . 3) "s" . 4)
        (1 (2 . 3) "s" . 4)
        "#,
    );
    assert!(vm.heap().stats().collections > 100);
}

#[test]
fn test_garbage_is_reclaimed() {
    let mut vm = Vm::with_config(VmConfig {
        gc_threshold: 100,
        ..VmConfig::default()
    });
    vm.eval_str("(define keep (cons 1 2))").unwrap();
    for _ in 0..2000 {
        vm.eval_str("(cons (list 1 2 3) \"garbage\")").unwrap();
    }
    let stats = vm.heap().stats();
    assert!(stats.collections > 0);
    assert!(stats.freed > 5000);
    assert!(vm.heap().len() < 2 * vm.heap().threshold());
    assert_eq!(transcript(&mut vm, "keep").trim(), "> keep\n(1 . 2)");
}

#[test]
#[should_panic(expected = "Stack overflow")]
fn test_runaway_recursion_overflows_stack() {
    let mut vm = Vm::with_config(VmConfig {
        stack_capacity: 64,
        ..VmConfig::default()
    });
    let _ = vm.eval_str("(define f (lambda () (f))) (f)");
}

/// Run a fresh vm on a thread sized the way the front-end sizes it.
fn on_vm_thread<T: Send + 'static>(
    config: VmConfig,
    f: impl FnOnce(&mut Vm) -> T + Send + 'static,
) -> std::thread::Result<T> {
    std::thread::Builder::new()
        .stack_size(config.native_stack_size())
        .spawn(move || f(&mut Vm::with_config(config)))
        .expect("spawn vm thread")
        .join()
}

#[test]
fn test_deep_recursion_within_stack_capacity() {
    let depth = on_vm_thread(VmConfig::default(), |vm| {
        let val = vm
            .eval_str(
                "(define count (lambda (n) (if ((= n 0) 0) (true (+ 1 (count (- n 1)))))))
                 (count 1000)",
            )
            .unwrap();
        vm.write_to_string(val)
    })
    .unwrap();
    assert_eq!(depth, "1000");
}

#[test]
fn test_execution_stack_overflows_before_native_stack() {
    let payload = on_vm_thread(VmConfig::default(), |vm| {
        let _ = vm.eval_str("(define f (lambda () (f))) (f)");
    })
    .unwrap_err();
    let message = payload
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.starts_with("Stack overflow"), "{}", message);
}
