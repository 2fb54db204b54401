//! Modular and elementary number-theoretic arithmetic

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = (a as u128) + (b as u128);
        (sum % (q as u128)) as u64
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        ((a as u128 * b as u128) % q as u128) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Map a signed integer into Z_q
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        if val >= 0 {
            (val as u64) % q
        } else {
            (q - (val.unsigned_abs() % q)) % q
        }
    }

    /// Centered representative in (-q/2, q/2]
    #[inline]
    pub fn to_signed(val: u64, q: u64) -> i64 {
        if val <= q / 2 {
            val as i64
        } else {
            -((q - val) as i64)
        }
    }

    /// a^e mod q by square-and-multiply
    pub fn pow(mut a: u64, mut e: u64, q: u64) -> u64 {
        let mut acc = 1 % q;
        a %= q;
        while e > 0 {
            if e & 1 == 1 {
                acc = Self::mul(acc, a, q);
            }
            a = Self::mul(a, a, q);
            e >>= 1;
        }
        acc
    }

    /// Inverse of a modulo q, if gcd(a, q) = 1
    pub fn inv(a: u64, q: u64) -> Option<u64> {
        let (g, x, _) = extended_gcd(a as i128 % q as i128, q as i128);
        if g != 1 {
            return None;
        }
        Some(x.rem_euclid(q as i128) as u64)
    }
}

/// Greatest common divisor
pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn extended_gcd(a: i128, b: i128) -> (i128, i128, i128) {
    if a == 0 {
        (b, 0, 1)
    } else {
        let (g, x, y) = extended_gcd(b % a, a);
        (g, y - (b / a) * x, x)
    }
}

/// Deterministic Miller-Rabin for every u64
pub fn is_prime(n: u64) -> bool {
    const BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    if n < 2 {
        return false;
    }
    if let Some(&b) = BASES.iter().find(|&&b| n % b == 0) {
        return n == b;
    }

    let s = (n - 1).trailing_zeros();
    let d = (n - 1) >> s;
    BASES.iter().all(|&a| {
        let mut x = ModQ::pow(a, d, n);
        if x == 1 || x == n - 1 {
            return true;
        }
        for _ in 1..s {
            x = ModQ::mul(x, x, n);
            if x == n - 1 {
                return true;
            }
        }
        false
    })
}

/// Distinct prime factors of n in increasing order
pub fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut k = 2u64;
    while k <= n / k {
        if n % k == 0 {
            factors.push(k);
            while n % k == 0 {
                n /= k;
            }
        }
        k += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Euler's totient
pub fn euler_phi(n: u64) -> u64 {
    prime_factors(n)
        .into_iter()
        .fold(n, |acc, f| acc / f * (f - 1))
}

/// Multiplicative order of a modulo m, if a is a unit
pub fn multiplicative_order(a: u64, m: u64) -> Option<u64> {
    if m == 1 {
        return Some(1);
    }
    if gcd(a % m, m) != 1 {
        return None;
    }
    let mut val = a % m;
    let mut order = 1;
    while val != 1 {
        val = ModQ::mul(val, a, m);
        order += 1;
    }
    Some(order)
}

/// Smallest g with g² ≥ n (baby-step count for n giant-step positions)
pub fn ceil_sqrt(n: usize) -> usize {
    let mut g = (n as f64).sqrt() as usize;
    while g * g < n {
        g += 1;
    }
    while g > 1 && (g - 1) * (g - 1) >= n {
        g -= 1;
    }
    g.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 1152921504606830593;

    #[test]
    fn test_basic_ops() {
        assert_eq!(ModQ::add(Q - 1, 2, Q), 1);
        assert_eq!(ModQ::sub(3, 10, Q), Q - 7);
        assert_eq!(ModQ::mul(5, 7, Q), 35);
        assert_eq!(ModQ::negate(0, Q), 0);
        assert_eq!(ModQ::from_signed(-5, Q), Q - 5);
        assert_eq!(ModQ::to_signed(Q - 5, Q), -5);
    }

    #[test]
    fn test_pow_and_inverse() {
        assert_eq!(ModQ::pow(3, 88, 2047), 1);
        assert_eq!(ModQ::inv(3, 8), Some(3));
        assert_eq!(ModQ::inv(2, 8), None);
        let x = ModQ::inv(12345, Q).unwrap();
        assert_eq!(ModQ::mul(x, 12345, Q), 1);
    }

    #[test]
    fn test_number_theory() {
        assert_eq!(euler_phi(2047), 1936);
        assert_eq!(prime_factors(2047), vec![23, 89]);
        assert_eq!(multiplicative_order(2, 2047), Some(11));
        assert_eq!(multiplicative_order(2, 91), Some(12));
        assert_eq!(multiplicative_order(7, 91), None);
        assert!(is_prime(65537));
        assert!(!is_prime(2047));
        assert!(!is_prime(1));
        assert!(is_prime(2) && is_prime(37) && !is_prime(39));
        // strong pseudoprime to bases 2, 3, 5 and 7
        assert!(!is_prime(3_215_031_751));
        assert!(is_prime(Q));
        assert!(is_prime(18_446_744_073_709_551_557));
        assert!(!is_prime(u64::MAX));
        assert!(!is_prime(4_294_967_291 * 4_294_967_279));
        assert_eq!(gcd(2047, 23), 23);
    }

    #[test]
    fn test_ceil_sqrt() {
        assert_eq!(ceil_sqrt(1), 1);
        assert_eq!(ceil_sqrt(88), 10);
        assert_eq!(ceil_sqrt(100), 10);
        assert_eq!(ceil_sqrt(101), 11);
    }
}
