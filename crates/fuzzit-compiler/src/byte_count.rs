use std::fmt;

use fuzzit_ir::{Expr, Ident};

/// A number of input bytes, known partly at generation time and partly
/// only at run time.
///
/// Scalars contribute a literal width; every pointer argument contributes
/// a 4-byte prefix plus the length value the harness reads from that
/// prefix. A dispatch case's running offset and its consumed total are
/// both a `ByteCount`, and both are spelled into C via [`to_expr`].
///
/// ```text
///   terms: [Bytes(4), Bytes(4), Length(len_0_1), Bytes(2)]
///   to_expr  →  10 + len_0_1
///
///   two lengths →  (8 + len_0_0) + len_0_1
/// ```
///
/// [`to_expr`]: ByteCount::to_expr
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteCount {
    terms: Vec<Term>,
}

/// One summand of a [`ByteCount`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    /// A width fixed at generation time.
    Bytes(usize),
    /// The run-time value of a decoded length prefix.
    Length(Ident),
}

impl ByteCount {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn bytes(n: usize) -> Self {
        Self {
            terms: vec![Term::Bytes(n)],
        }
    }

    /// What a length-prefixed pointer argument consumes: the prefix and
    /// the payload whose size is stored in `length`.
    pub fn length_prefixed(prefix_bytes: usize, length: &Ident) -> Self {
        Self {
            terms: vec![Term::Bytes(prefix_bytes), Term::Length(length.clone())],
        }
    }

    #[must_use]
    pub fn plus(&self, other: &ByteCount) -> Self {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Self { terms }
    }

    #[must_use]
    pub fn plus_bytes(&self, n: usize) -> Self {
        self.plus(&Self::bytes(n))
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Sum of the literal terms.
    pub fn fixed(&self) -> usize {
        self.terms
            .iter()
            .map(|t| match t {
                Term::Bytes(n) => *n,
                Term::Length(_) => 0,
            })
            .sum()
    }

    /// Length variables in the order they were added.
    pub fn lengths(&self) -> impl Iterator<Item = &Ident> {
        self.terms.iter().filter_map(|t| match t {
            Term::Length(name) => Some(name),
            Term::Bytes(_) => None,
        })
    }

    /// The value, if no run-time lengths are involved.
    pub fn constant(&self) -> Option<usize> {
        if self.lengths().next().is_none() {
            Some(self.fixed())
        } else {
            None
        }
    }

    /// Evaluate with concrete length values, as a test or simulator would.
    pub fn evaluate(&self, mut length_of: impl FnMut(&Ident) -> usize) -> usize {
        self.fixed() + self.lengths().map(&mut length_of).sum::<usize>()
    }

    /// Spell the count as a C expression.
    ///
    /// Literals fold into a single constant that leads the sum; the
    /// constant is dropped when it is zero and lengths follow.
    pub fn to_expr(&self) -> Expr {
        let fixed = self.fixed();
        let mut lengths = self.lengths();
        let Some(first) = lengths.next() else {
            return Expr::int(fixed);
        };
        let head = if fixed == 0 {
            Expr::ident(first)
        } else {
            Expr::add(Expr::int(fixed), Expr::ident(first))
        };
        lengths.fold(head, |acc, name| Expr::add(acc, Expr::ident(name)))
    }
}

impl fmt::Display for ByteCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&fuzzit_ir::render_expr(&self.to_expr()))
    }
}

impl<'a> std::iter::Sum<&'a ByteCount> for ByteCount {
    fn sum<I: Iterator<Item = &'a ByteCount>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, next| acc.plus(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn len(a: usize, b: usize) -> Ident {
        Ident::indexed("len", a, b)
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(ByteCount::zero().to_string(), "0");
        assert_eq!(ByteCount::zero().constant(), Some(0));
    }

    #[test]
    fn literals_fold() {
        let count = ByteCount::bytes(4).plus_bytes(2).plus_bytes(1);
        assert_eq!(count.to_string(), "7");
        assert_eq!(count.constant(), Some(7));
    }

    #[test]
    fn constant_leads_lengths() {
        let count = ByteCount::bytes(4)
            .plus(&ByteCount::length_prefixed(4, &len(0, 1)))
            .plus_bytes(2);
        assert_eq!(count.to_string(), "10 + len_0_1");
        assert_eq!(count.constant(), None);
    }

    #[test]
    fn zero_constant_dropped() {
        let count = ByteCount::zero().plus(&ByteCount::length_prefixed(0, &len(2, 0)));
        assert_eq!(count.to_string(), "len_2_0");
    }

    #[test]
    fn multiple_lengths_keep_order() {
        let count = ByteCount::length_prefixed(4, &len(0, 0))
            .plus(&ByteCount::length_prefixed(4, &len(0, 1)));
        assert_eq!(count.to_string(), "(8 + len_0_0) + len_0_1");
        let lengths: Vec<&str> = count.lengths().map(Ident::as_str).collect();
        assert_eq!(lengths, ["len_0_0", "len_0_1"]);
    }

    #[test]
    fn evaluate_substitutes_lengths() {
        let count = ByteCount::bytes(2).plus(&ByteCount::length_prefixed(4, &len(0, 1)));
        assert_eq!(count.evaluate(|_| 5), 11);
    }

    #[test]
    fn sum_concatenates() {
        let parts = [ByteCount::bytes(1), ByteCount::bytes(8)];
        let total: ByteCount = parts.iter().sum();
        assert_eq!(total.constant(), Some(9));
    }
}
