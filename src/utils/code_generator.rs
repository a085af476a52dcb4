use rand::Rng;
use rand::rngs::OsRng;

/// Four-digit OTP, uniform over "0000"..="9999", drawn from the OS CSPRNG.
pub fn generate_four_digit_code() -> String {
    format!("{:04}", OsRng.gen_range(0..10_000u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_four_digit_code() {
        for _ in 0..2_000 {
            let code = generate_four_digit_code();
            assert_eq!(code.len(), 4, "{code}");
            assert!(code.chars().all(|c| c.is_ascii_digit()), "{code}");

            let code_num: u32 = code.parse().unwrap();
            assert!(code_num <= 9_999);
        }
    }

    #[test]
    fn test_generate_keeps_leading_zeros() {
        // P(no code below 1000 in 10k draws) = 0.9^10000, i.e. never
        let codes: Vec<String> = (0..10_000).map(|_| generate_four_digit_code()).collect();
        assert!(codes.iter().any(|c| c.starts_with('0')));
        assert!(codes.iter().all(|c| c.len() == 4));
    }

    #[test]
    fn test_generate_spreads_over_space() {
        let distinct: HashSet<String> = (0..1_000).map(|_| generate_four_digit_code()).collect();
        // 1000 draws from 10k values collide ~50 times on average
        assert!(distinct.len() > 850, "only {} distinct codes", distinct.len());
    }
}
