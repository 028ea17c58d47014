//! Whirlpool-style pool pricing
//!
//! Pools store `sqrt(price)` as a Q64.64 fixed-point `u128`, with price in
//! base units of B per base unit of A. The display price scales that by
//! `10^(decimals_a - decimals_b)`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    #[error("Amount must be a finite, non-negative number (got {0})")]
    InvalidAmount(f64),

    #[error("Pool price is zero")]
    ZeroPrice,

    #[error("Amount {amount} with {decimals} decimals overflows u64")]
    Overflow { amount: f64, decimals: u8 },
}

/// Swap direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapDirection {
    AToB,
    BToA,
}

impl SwapDirection {
    pub fn flipped(self) -> Self {
        match self {
            SwapDirection::AToB => SwapDirection::BToA,
            SwapDirection::BToA => SwapDirection::AToB,
        }
    }
}

/// Snapshot of the fields a quote needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolPrice {
    pub sqrt_price_x64: u128,
    pub decimals_a: u8,
    pub decimals_b: u8,
}

impl PoolPrice {
    /// Human price of one A in B
    pub fn price(&self) -> f64 {
        price_from_sqrt_x64(self.sqrt_price_x64, self.decimals_a, self.decimals_b)
    }

    /// Output amount, in display units, for `amount` display units in
    pub fn quote(&self, amount: f64, direction: SwapDirection) -> Result<f64, QuoteError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(QuoteError::InvalidAmount(amount));
        }
        let price = self.price();
        if price == 0.0 {
            return Err(QuoteError::ZeroPrice);
        }
        Ok(match direction {
            SwapDirection::AToB => amount * price,
            SwapDirection::BToA => amount / price,
        })
    }

    /// Input amount in base units of the token being sold
    pub fn input_base_units(
        &self,
        amount: f64,
        direction: SwapDirection,
    ) -> Result<u64, QuoteError> {
        let decimals = match direction {
            SwapDirection::AToB => self.decimals_a,
            SwapDirection::BToA => self.decimals_b,
        };
        to_base_units(amount, decimals)
    }
}

pub fn price_from_sqrt_x64(sqrt_price_x64: u128, decimals_a: u8, decimals_b: u8) -> f64 {
    let sqrt = sqrt_price_x64 as f64 / 2f64.powi(64);
    sqrt * sqrt * 10f64.powi(decimals_a as i32 - decimals_b as i32)
}

/// Floor `amount * 10^decimals`
pub fn to_base_units(amount: f64, decimals: u8) -> Result<u64, QuoteError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(QuoteError::InvalidAmount(amount));
    }
    let scaled = (amount * 10f64.powi(decimals as i32)).floor();
    if scaled > u64::MAX as f64 {
        return Err(QuoteError::Overflow { amount, decimals });
    }
    Ok(scaled as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_X64: u128 = 1u128 << 64;

    #[test]
    fn test_unit_sqrt_price() {
        assert_eq!(price_from_sqrt_x64(ONE_X64, 6, 6), 1.0);
        // sqrt = 2 => price 4
        assert_eq!(price_from_sqrt_x64(2 * ONE_X64, 9, 9), 4.0);
    }

    #[test]
    fn test_decimal_adjustment() {
        // SOL (9) / USDC (6): raw ratio 1e-7 => 100 USDC per SOL
        let raw_price = 1e-7f64;
        let sqrt_x64 = (raw_price.sqrt() * 2f64.powi(64)) as u128;
        let price = price_from_sqrt_x64(sqrt_x64, 9, 6);
        assert!((price - 100.0).abs() < 1e-6, "price was {}", price);
    }

    #[test]
    fn test_quotes_both_directions() {
        let pool = PoolPrice {
            sqrt_price_x64: 2 * ONE_X64,
            decimals_a: 6,
            decimals_b: 6,
        };
        assert_eq!(pool.quote(3.0, SwapDirection::AToB).unwrap(), 12.0);
        assert_eq!(pool.quote(12.0, SwapDirection::BToA).unwrap(), 3.0);
        assert!(matches!(
            pool.quote(-1.0, SwapDirection::AToB),
            Err(QuoteError::InvalidAmount(_))
        ));

        let empty = PoolPrice {
            sqrt_price_x64: 0,
            ..pool
        };
        assert_eq!(empty.quote(1.0, SwapDirection::BToA), Err(QuoteError::ZeroPrice));
    }

    #[test]
    fn test_base_units_floor() {
        assert_eq!(to_base_units(1.5, 9).unwrap(), 1_500_000_000);
        assert_eq!(to_base_units(0.1234567, 6).unwrap(), 123_456);
        assert!(to_base_units(f64::NAN, 6).is_err());
        assert!(matches!(
            to_base_units(1e30, 9),
            Err(QuoteError::Overflow { .. })
        ));

        let pool = PoolPrice {
            sqrt_price_x64: ONE_X64,
            decimals_a: 9,
            decimals_b: 6,
        };
        assert_eq!(pool.input_base_units(2.0, SwapDirection::BToA).unwrap(), 2_000_000);
        assert_eq!(SwapDirection::AToB.flipped(), SwapDirection::BToA);
    }
}
