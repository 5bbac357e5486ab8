//! End-to-end classification scenarios, built programmatically through the
//! IR builder. Each mirrors a small C program.

use argus_analysis::{
    AllocationOracle, Analyzer, CollectingReporter, Finding, FindingKind, Severity, Totals,
};
use argus_ir::{BinOp, Func, FunctionBuilder, IcmpPred, Module, Ty};

fn run(module: &Module) -> (Totals, Vec<Finding>) {
    let mut sink = CollectingReporter::default();
    let totals = Analyzer::new(module, AllocationOracle::default(), true, &mut sink).run();
    (totals, sink.findings)
}

fn i64_ty() -> Ty {
    Ty::Int(64)
}

fn declare_malloc(m: &mut Module) -> Func {
    m.declare_function("malloc", vec![(None, i64_ty())], Ty::ptr_to(Ty::Int(8)))
}

fn declare_external(m: &mut Module) -> Func {
    m.declare_function("external", vec![], i64_ty())
}

/// ```c
/// int* a = malloc(7 * sizeof(int));
/// for (x = 0; x < 10; ++x) {
///     if (x < 7) a[x] = 5;  // ok
///     a[x] = 6;             // overflow
/// }
/// ```
#[test]
fn guarded_store_ok_unguarded_store_overflows() {
    let mut m = Module::new("s1.c");
    let malloc = declare_malloc(&mut m);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);

    let entry = b.block("entry");
    let header = b.block("header");
    let body = b.block("body");
    let then = b.block("then");
    let cont = b.block("cont");
    let exit = b.block("exit");

    b.set_block(entry);
    let c28 = b.const_int(i64_ty(), 28);
    let raw = b.call(malloc, Ty::ptr_to(Ty::Int(8)), [c28]).unwrap();
    let a = b.bitcast(raw, Ty::ptr_to(Ty::Int(32)));
    b.br(header);

    b.set_block(header);
    let x = b.phi(i64_ty());
    let c10 = b.const_int(i64_ty(), 10);
    let cond = b.icmp(IcmpPred::Slt, x, c10);
    b.cond_br(cond, body, exit);

    b.set_block(body);
    let c7 = b.const_int(i64_ty(), 7);
    let guard = b.icmp(IcmpPred::Slt, x, c7);
    b.cond_br(guard, then, cont);

    b.set_block(then);
    let g1 = b.gep(Ty::Int(32), a, [x]);
    let five = b.const_int(Ty::Int(32), 5);
    let guarded_store = b.store(five, g1);
    b.br(cont);

    b.set_block(cont);
    let g2 = b.gep(Ty::Int(32), a, [x]);
    let six = b.const_int(Ty::Int(32), 6);
    let unguarded_store = b.store(six, g2);
    let one = b.const_int(i64_ty(), 1);
    let x1 = b.binary(BinOp::Add, x, one);
    b.br(header);

    b.set_block(exit);
    b.ret(None);

    let zero = b.const_int(i64_ty(), 0);
    b.add_incoming(x, zero, entry);
    b.add_incoming(x, x1, cont);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 1);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 1);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Definite);
    assert_eq!(findings[0].instr, unguarded_store);
    assert_ne!(findings[0].instr, guarded_store);
}

/// ```c
/// int arr[10];
/// for (x = 0; x < 10; ++x) arr[x] = 6;  // ok
/// for (y = 0; y < 15; ++y) arr[y] = 6;  // overflow
/// ```
#[test]
fn second_loop_overruns_global_array() {
    let mut m = Module::new("s2.c");
    let arr_ty = Ty::array_of(Ty::Int(32), 10);
    let arr = m.add_global("arr", arr_ty.clone(), None, false);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);

    let entry = b.block("entry");
    let h1 = b.block("h1");
    let b1 = b.block("b1");
    let h2 = b.block("h2");
    let b2 = b.block("b2");
    let exit = b.block("exit");

    b.set_block(entry);
    b.br(h1);

    b.set_block(h1);
    let x = b.phi(i64_ty());
    let c10 = b.const_int(i64_ty(), 10);
    let c1 = b.icmp(IcmpPred::Slt, x, c10);
    b.cond_br(c1, b1, h2);

    b.set_block(b1);
    let zero_idx = b.const_int(i64_ty(), 0);
    let g1 = b.gep(arr_ty.clone(), arr, [zero_idx, x]);
    let six = b.const_int(Ty::Int(32), 6);
    let first_loop_store = b.store(six, g1);
    let one = b.const_int(i64_ty(), 1);
    let x1 = b.binary(BinOp::Add, x, one);
    b.br(h1);

    b.set_block(h2);
    let y = b.phi(i64_ty());
    let c15 = b.const_int(i64_ty(), 15);
    let c2 = b.icmp(IcmpPred::Slt, y, c15);
    b.cond_br(c2, b2, exit);

    b.set_block(b2);
    let g2 = b.gep(arr_ty, arr, [zero_idx, y]);
    let second_loop_store = b.store(six, g2);
    let y1 = b.binary(BinOp::Add, y, one);
    b.br(h2);

    b.set_block(exit);
    b.ret(None);

    let zero = b.const_int(i64_ty(), 0);
    b.add_incoming(x, zero, entry);
    b.add_incoming(x, x1, b1);
    b.add_incoming(y, zero, h1);
    b.add_incoming(y, y1, b2);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 1);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 1);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Definite);
    assert_eq!(findings[0].instr, second_loop_store);
    assert_ne!(findings[0].instr, first_loop_store);
}

/// ```c
/// void f(long i) { int* a = malloc(7 * sizeof(int)); a[i] = 1; }
/// int main() { f(5); f(10); }
/// ```
///
/// The access in `f` is inconclusive on its own; the second callsite
/// discharges the trigger.
#[test]
fn trigger_discharged_at_second_callsite() {
    let mut m = Module::new("s3.c");
    let malloc = declare_malloc(&mut m);
    let f = m.declare_function("f", vec![(Some("i".into()), i64_ty())], Ty::Void);
    let store_in_f = {
        let mut b = FunctionBuilder::new(&mut m, f);
        b.block("entry");
        let i = b.param(0);
        let c28 = b.const_int(i64_ty(), 28);
        let raw = b.call(malloc, Ty::ptr_to(Ty::Int(8)), [c28]).unwrap();
        let a = b.bitcast(raw, Ty::ptr_to(Ty::Int(32)));
        let g = b.gep(Ty::Int(32), a, [i]);
        let one = b.const_int(Ty::Int(32), 1);
        let store = b.store(one, g);
        b.ret(None);
        store
    };

    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);
    b.block("entry");
    let c5 = b.const_int(i64_ty(), 5);
    let c10 = b.const_int(i64_ty(), 10);
    let _ = b.call(f, Ty::Void, [c5]);
    let _ = b.call(f, Ty::Void, [c10]);
    b.ret(None);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 1);
    assert_eq!(totals.indeterminate, 0);
    // The intraprocedural pass over `f` classified the access as in-bounds.
    assert_eq!(totals.correct, 1);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Definite);
    assert_eq!(findings[0].instr, store_in_f);
    assert!(findings[0].idx_range.is_none());
}

/// ```c
/// long n = external();
/// char* p = malloc(n);
/// for (i = 0; i < n; ++i) p[i] = 0;  // ok
/// ```
#[test]
fn loop_bounded_by_allocation_size_is_safe() {
    let mut m = Module::new("s4.c");
    let malloc = declare_malloc(&mut m);
    let external = declare_external(&mut m);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);

    let entry = b.block("entry");
    let header = b.block("header");
    let body = b.block("body");
    let exit = b.block("exit");

    b.set_block(entry);
    let n = b.call(external, i64_ty(), []).unwrap();
    let p = b.call(malloc, Ty::ptr_to(Ty::Int(8)), [n]).unwrap();
    b.br(header);

    b.set_block(header);
    let i = b.phi(i64_ty());
    let cond = b.icmp(IcmpPred::Slt, i, n);
    b.cond_br(cond, body, exit);

    b.set_block(body);
    let g = b.gep(Ty::Int(8), p, [i]);
    let zero8 = b.const_int(Ty::Int(8), 0);
    b.store(zero8, g);
    let one = b.const_int(i64_ty(), 1);
    let i1 = b.binary(BinOp::Add, i, one);
    b.br(header);

    b.set_block(exit);
    b.ret(None);

    let zero = b.const_int(i64_ty(), 0);
    b.add_incoming(i, zero, entry);
    b.add_incoming(i, i1, body);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 0);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 1);
    assert!(findings.is_empty());
}

/// ```c
/// long n = external();
/// char* p = malloc(n);
/// for (i = 0; i < n + 5; ++i) p[i] = 0;  // overflow
/// ```
#[test]
fn loop_overrunning_allocation_size_is_definite() {
    let mut m = Module::new("s5.c");
    let malloc = declare_malloc(&mut m);
    let external = declare_external(&mut m);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);

    let entry = b.block("entry");
    let header = b.block("header");
    let body = b.block("body");
    let exit = b.block("exit");

    b.set_block(entry);
    let n = b.call(external, i64_ty(), []).unwrap();
    let p = b.call(malloc, Ty::ptr_to(Ty::Int(8)), [n]).unwrap();
    let c5 = b.const_int(i64_ty(), 5);
    let bound = b.binary(BinOp::Add, n, c5);
    b.br(header);

    b.set_block(header);
    let i = b.phi(i64_ty());
    let cond = b.icmp(IcmpPred::Slt, i, bound);
    b.cond_br(cond, body, exit);

    b.set_block(body);
    let g = b.gep(Ty::Int(8), p, [i]);
    let zero8 = b.const_int(Ty::Int(8), 0);
    let store = b.store(zero8, g);
    let one = b.const_int(i64_ty(), 1);
    let i1 = b.binary(BinOp::Add, i, one);
    b.br(header);

    b.set_block(exit);
    b.ret(None);

    let zero = b.const_int(i64_ty(), 0);
    b.add_incoming(i, zero, entry);
    b.add_incoming(i, i1, body);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 1);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 0);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].severity, Severity::Definite);
    assert_eq!(findings[0].instr, store);
}

/// ```c
/// long x = external();
/// int p[8];
/// if (x == 3) p[x] = 8;  // ok, the equality pins x
/// ```
#[test]
fn equality_refinement_pins_index() {
    let mut m = Module::new("s6.c");
    let external = declare_external(&mut m);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);

    let entry = b.block("entry");
    let then = b.block("then");
    let exit = b.block("exit");

    b.set_block(entry);
    let x = b.call(external, i64_ty(), []).unwrap();
    let c8 = b.const_int(i64_ty(), 8);
    let p = b.alloca(Ty::Int(32), c8);
    let c3 = b.const_int(i64_ty(), 3);
    let cond = b.icmp(IcmpPred::Eq, x, c3);
    b.cond_br(cond, then, exit);

    b.set_block(then);
    let g = b.gep(Ty::Int(32), p, [x]);
    let v = b.const_int(Ty::Int(32), 8);
    b.store(v, g);
    b.br(exit);

    b.set_block(exit);
    b.ret(None);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 0);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 1);
    assert!(findings.is_empty());
}

/// `for (i = 0; i != 10; ++i) p[i] = 0;` with `p` of size 10: the loop-exit
/// inequality bounds the induction variable.
#[test]
fn ne_exit_condition_bounds_induction_variable() {
    let mut m = Module::new("s7.c");
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);

    let entry = b.block("entry");
    let header = b.block("header");
    let body = b.block("body");
    let exit = b.block("exit");

    b.set_block(entry);
    let c10 = b.const_int(i64_ty(), 10);
    let p = b.alloca(Ty::Int(32), c10);
    b.br(header);

    b.set_block(header);
    let i = b.phi(i64_ty());
    let cond = b.icmp(IcmpPred::Ne, i, c10);
    b.cond_br(cond, body, exit);

    b.set_block(body);
    let g = b.gep(Ty::Int(32), p, [i]);
    let zero32 = b.const_int(Ty::Int(32), 0);
    b.store(zero32, g);
    let one = b.const_int(i64_ty(), 1);
    let i1 = b.binary(BinOp::Add, i, one);
    b.br(header);

    b.set_block(exit);
    b.ret(None);

    let zero = b.const_int(i64_ty(), 0);
    b.add_incoming(i, zero, entry);
    b.add_incoming(i, i1, body);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 0);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 1);
    assert!(findings.is_empty());
}

/// A value loaded from a constant table with a known index evaluates to the
/// indexed constants, which then bounds a second access.
#[test]
fn constant_table_load_folds_to_element_range() {
    let mut m = Module::new("s9.c");
    let tbl_ty = Ty::array_of(Ty::Int(32), 4);
    let init = m.const_data_array(Ty::Int(32), vec![1, 2, 42, 3]);
    let tbl = m.add_global("tbl", tbl_ty.clone(), Some(init), true);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);
    b.block("entry");
    let zero = b.const_int(i64_ty(), 0);
    let k = b.const_int(i64_ty(), 2);
    let g1 = b.gep(tbl_ty, tbl, [zero, k]);
    let v = b.load(Ty::Int(32), g1);
    let c45 = b.const_int(i64_ty(), 45);
    let p = b.alloca(Ty::Int(32), c45);
    let g2 = b.gep(Ty::Int(32), p, [v]);
    let one = b.const_int(Ty::Int(32), 1);
    b.store(one, g2);
    b.ret(None);

    // tbl[2] == 42 fits a 45-element buffer; had the load stayed opaque the
    // second store would be indeterminate.
    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 0);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 2);
    assert!(findings.is_empty());
}

/// An out-of-bounds constant-table index is reported both as an access
/// overflow and as a vulnerable constant-aggregate load.
#[test]
fn constant_table_load_out_of_bounds() {
    let mut m = Module::new("s10.c");
    let tbl_ty = Ty::array_of(Ty::Int(32), 4);
    let init = m.const_data_array(Ty::Int(32), vec![1, 2, 42, 3]);
    let tbl = m.add_global("tbl", tbl_ty.clone(), Some(init), true);
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);
    b.block("entry");
    let zero = b.const_int(i64_ty(), 0);
    let k = b.const_int(i64_ty(), 7);
    let g1 = b.gep(tbl_ty, tbl, [zero, k]);
    let v = b.load(Ty::Int(32), g1);
    let c45 = b.const_int(i64_ty(), 45);
    let p = b.alloca(Ty::Int(32), c45);
    let g2 = b.gep(Ty::Int(32), p, [v]);
    let one = b.const_int(Ty::Int(32), 1);
    b.store(one, g2);
    b.ret(None);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 2);
    assert_eq!(totals.indeterminate, 1);
    assert_eq!(totals.correct, 0);
    assert!(
        findings
            .iter()
            .any(|f| f.kind == FindingKind::ConstAggregate)
    );
}

/// A store through a pointer that never came from pointer arithmetic is
/// counted as correct without further analysis.
#[test]
fn plain_store_through_alloca_is_correct() {
    let mut m = Module::new("s8.c");
    let main = m.declare_function("main", vec![], Ty::Void);
    let mut b = FunctionBuilder::new(&mut m, main);
    b.block("entry");
    let one = b.const_int(i64_ty(), 1);
    let p = b.alloca(Ty::Int(64), one);
    b.store(one, p);
    let _ = b.load(Ty::Int(64), p);
    b.ret(None);

    let (totals, findings) = run(&m);
    assert_eq!(totals.overflows, 0);
    assert_eq!(totals.indeterminate, 0);
    assert_eq!(totals.correct, 2);
    assert!(findings.is_empty());
}
