use std::cmp::Ordering;

/// Compara versiones por componentes numéricos separados por punto.
/// Componentes ausentes o no numéricos cuentan como 0 (`2.1 == 2.1.0`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> { v.trim().split('.').map(|c| c.trim().parse().unwrap_or(0)).collect() };
    let (left, right) = (parse(a), parse(b));
    let len = left.len().max(right.len());
    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_numerically_not_lexically() {
        assert_eq!(compare_versions("2.10", "2.9"), Ordering::Greater);
        assert_eq!(compare_versions("2.1", "2.1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("2.1.0.30", "2.2"), Ordering::Less);
    }
}
