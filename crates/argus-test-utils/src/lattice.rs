//! Assertion helpers for the lattice laws.
//!
//! Each helper exercises one family of laws over a caller-supplied sample of
//! elements. Violations are accumulated and reported together in a single
//! panic message, which beats chasing them one `assert!` at a time.

use argus_ir::{HasBottom, HasTop, Lattice};
use std::fmt::{Debug, Write};

fn report(violations: Vec<String>) {
    if violations.is_empty() {
        return;
    }
    let mut msg = format!("{} lattice law violation(s):\n", violations.len());
    for (i, v) in violations.iter().enumerate() {
        let _ = writeln!(msg, "  {}. {}", i + 1, v);
    }
    panic!("{msg}");
}

/// Check that `join` is commutative, associative, and idempotent over the
/// given elements.
pub fn assert_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    report(violations);
}

/// Check that `meet` is commutative, associative, and idempotent over the
/// given elements.
pub fn assert_meet_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_meet_laws(elements, &mut violations);
    report(violations);
}

/// Check the absorption laws `a.join(&a.meet(&b)) == a` and
/// `a.meet(&a.join(&b)) == a` over the given elements.
pub fn assert_absorption<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_absorption(elements, &mut violations);
    report(violations);
}

/// Check that `is_subseteq` is consistent with `join` and `meet` over the
/// given elements.
pub fn assert_ordering_consistent<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_ordering_consistent(elements, &mut violations);
    report(violations);
}

/// Check all lattice laws over the given elements: join laws, meet laws,
/// absorption, and ordering consistency. All violations are collected and
/// reported together.
///
/// # Example
///
/// ```
/// use argus_test_utils::Chain;
/// use argus_test_utils::lattice::assert_lattice_laws;
///
/// assert_lattice_laws(&[Chain(0), Chain(3), Chain(200)]);
/// ```
pub fn assert_lattice_laws<L: Lattice + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    check_meet_laws(elements, &mut violations);
    check_absorption(elements, &mut violations);
    check_ordering_consistent(elements, &mut violations);
    report(violations);
}

/// Check that `bottom()` satisfies the bottom element laws against every
/// element in the given slice.
pub fn assert_bottom_laws<L: HasBottom + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_bottom_laws(elements, &mut violations);
    report(violations);
}

/// Check that `top()` satisfies the top element laws against every element
/// in the given slice.
pub fn assert_top_laws<L: HasTop + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_top_laws(elements, &mut violations);
    report(violations);
}

/// Check all lattice laws plus bottom and top element laws. All violations
/// are collected and reported together.
///
/// # Example
///
/// ```
/// use argus_test_utils::Chain;
/// use argus_test_utils::lattice::assert_finite_lattice_laws;
///
/// assert_finite_lattice_laws(&[Chain(0), Chain(3), Chain(200)]);
/// ```
pub fn assert_finite_lattice_laws<L: HasBottom + HasTop + PartialEq + Debug>(elements: &[L]) {
    let mut violations = Vec::new();
    check_join_laws(elements, &mut violations);
    check_meet_laws(elements, &mut violations);
    check_absorption(elements, &mut violations);
    check_ordering_consistent(elements, &mut violations);
    check_bottom_laws(elements, &mut violations);
    check_top_laws(elements, &mut violations);
    report(violations);
}

// ---- internal helpers that push violations instead of panicking ----

fn check_join_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        if a.join(a) != *a {
            v.push(format!("join not idempotent: {a:?}.join({a:?}) != {a:?}"));
        }
        for b in elements {
            if a.join(b) != b.join(a) {
                v.push(format!(
                    "join not commutative: {a:?}.join({b:?}) != {b:?}.join({a:?})"
                ));
            }
            for c in elements {
                if a.join(b).join(c) != a.join(&b.join(c)) {
                    v.push(format!(
                        "join not associative for {a:?}, {b:?}, {c:?}"
                    ));
                }
            }
        }
    }
}

fn check_meet_laws<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        if a.meet(a) != *a {
            v.push(format!("meet not idempotent: {a:?}.meet({a:?}) != {a:?}"));
        }
        for b in elements {
            if a.meet(b) != b.meet(a) {
                v.push(format!(
                    "meet not commutative: {a:?}.meet({b:?}) != {b:?}.meet({a:?})"
                ));
            }
            for c in elements {
                if a.meet(b).meet(c) != a.meet(&b.meet(c)) {
                    v.push(format!(
                        "meet not associative for {a:?}, {b:?}, {c:?}"
                    ));
                }
            }
        }
    }
}

fn check_absorption<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        for b in elements {
            if a.join(&a.meet(b)) != *a {
                v.push(format!(
                    "absorption violated: {a:?}.join({a:?}.meet({b:?})) != {a:?}"
                ));
            }
            if a.meet(&a.join(b)) != *a {
                v.push(format!(
                    "absorption violated: {a:?}.meet({a:?}.join({b:?})) != {a:?}"
                ));
            }
        }
    }
}

fn check_ordering_consistent<L: Lattice + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    for a in elements {
        for b in elements {
            let le = a.is_subseteq(b);
            if le != (a.join(b) == *b) {
                v.push(format!(
                    "is_subseteq inconsistent with join for {a:?}, {b:?}"
                ));
            }
            if le != (a.meet(b) == *a) {
                v.push(format!(
                    "is_subseteq inconsistent with meet for {a:?}, {b:?}"
                ));
            }
        }
    }
}

fn check_bottom_laws<L: HasBottom + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    let bot = L::bottom();
    for x in elements {
        if !bot.is_subseteq(x) {
            v.push(format!("bottom not below {x:?}"));
        }
        if bot.join(x) != *x {
            v.push(format!("bottom not join identity for {x:?}"));
        }
        if bot.meet(x) != bot {
            v.push(format!("bottom does not absorb meet for {x:?}"));
        }
    }
}

fn check_top_laws<L: HasTop + PartialEq + Debug>(elements: &[L], v: &mut Vec<String>) {
    let top = L::top();
    for x in elements {
        if !x.is_subseteq(&top) {
            v.push(format!("top not above {x:?}"));
        }
        if top.join(x) != top {
            v.push(format!("top does not absorb join for {x:?}"));
        }
        if top.meet(x) != *x {
            v.push(format!("top not meet identity for {x:?}"));
        }
    }
}
