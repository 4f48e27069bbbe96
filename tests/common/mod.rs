#![allow(dead_code)]

use cdcl_sat::sat::cnf::Cnf;

/// `holes + 1` pigeons in `holes` holes; unsatisfiable for every `holes >= 1`.
pub fn pigeonhole(holes: i32) -> Cnf {
    let pigeons = holes + 1;
    let var = |p: i32, h: i32| p * holes + h + 1;
    let mut clauses: Vec<Vec<i32>> = (0..pigeons)
        .map(|p| (0..holes).map(|h| var(p, h)).collect())
        .collect();
    for h in 0..holes {
        for p in 0..pigeons {
            for q in p + 1..pigeons {
                clauses.push(vec![-var(p, h), -var(q, h)]);
            }
        }
    }
    Cnf::new(clauses).unwrap()
}

/// Random clauses of width `k` over distinct variables, seeded for reproducibility.
pub fn random_clauses(num_vars: u32, num_clauses: usize, k: usize, seed: u64) -> Vec<Vec<i32>> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..num_clauses)
        .map(|_| {
            let mut vars: Vec<u32> = Vec::with_capacity(k);
            while vars.len() < k.min(num_vars as usize) {
                let v = rng.u32(1..=num_vars);
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
            vars.into_iter()
                .map(|v| {
                    let v = i32::try_from(v).unwrap();
                    if rng.bool() { v } else { -v }
                })
                .collect()
        })
        .collect()
}

/// Decides satisfiability by enumerating every assignment.
pub fn brute_force_sat(num_vars: usize, clauses: &[Vec<i32>]) -> bool {
    assert!(num_vars <= 20, "too many variables to enumerate");
    (0u32..1 << num_vars).any(|bits| {
        clauses.iter().all(|clause| {
            clause.iter().any(|&lit| {
                let var = lit.unsigned_abs() - 1;
                let value = bits & (1 << var) != 0;
                value == (lit > 0)
            })
        })
    })
}
