//! Money collaborator boundary.
//!
//! The simulation treats the balance as opaque: sell-pads call
//! [`Economy::add_money`], paid placement calls [`Economy::try_spend_money`].
//! [`Wallet`] is the plain balance used by default.

/// The two operations the simulation needs from an economy.
pub trait Economy {
    fn add_money(&mut self, amount: f64);

    /// Deduct `amount` if affordable. Returns `false` and changes nothing
    /// otherwise.
    fn try_spend_money(&mut self, amount: f64) -> bool;
}

/// A simple balance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Wallet {
    balance: f64,
    /// Lifetime income from sales and refunds.
    earned: f64,
}

impl Wallet {
    pub fn new(balance: f64) -> Self {
        Self {
            balance,
            earned: 0.0,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn earned(&self) -> f64 {
        self.earned
    }
}

impl Economy for Wallet {
    fn add_money(&mut self, amount: f64) {
        self.balance += amount;
        self.earned += amount;
    }

    fn try_spend_money(&mut self, amount: f64) -> bool {
        if amount > self.balance {
            return false;
        }
        self.balance -= amount;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spend_within_balance() {
        let mut w = Wallet::new(10.0);
        assert!(w.try_spend_money(4.0));
        assert_eq!(w.balance(), 6.0);
    }

    #[test]
    fn overspend_is_refused_without_change() {
        let mut w = Wallet::new(3.0);
        assert!(!w.try_spend_money(5.0));
        assert_eq!(w.balance(), 3.0);
    }

    #[test]
    fn add_money_tracks_earnings() {
        let mut w = Wallet::new(0.0);
        w.add_money(2.5);
        w.add_money(1.5);
        assert_eq!(w.balance(), 4.0);
        assert_eq!(w.earned(), 4.0);
    }
}
