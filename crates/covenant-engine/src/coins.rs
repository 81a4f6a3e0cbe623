//! UTXO-style currency ledger.
//!
//! Coins are stored under `Currency/<owner>/<id>`. A coin is never edited
//! in place: a transfer deletes the coins it spends and mints new ones
//! for the payee and, when needed, change for the payer.

use covenant_core::{Amount, Coin, Provenance};
use covenant_ledger::{Invocation, Repository};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::events;

/// Composite-key tag for coins; also the prefix of minted coin ids.
pub const CURRENCY_TAG: &str = "Currency";

/// What a successful transfer did. Emitted as the `Transfer` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub reason: Provenance,
    /// Ids of the payer's coins that were consumed.
    pub spent: Vec<String>,
    /// The coin minted for the payee.
    pub credited: Coin,
    /// Change returned to the payer, if the spent coins exceeded `amount`.
    pub change: Option<Coin>,
}

/// Coin creation, enumeration, balances and transfers.
#[derive(Debug)]
pub struct CoinLedger {
    coins: Repository<Coin>,
}

impl CoinLedger {
    pub fn new() -> Self {
        Self {
            coins: Repository::new(CURRENCY_TAG),
        }
    }

    /// Persist a fully populated coin and emit `CreateCoin`.
    pub fn create_coin(&self, inv: &mut Invocation<'_>, coin: &Coin) -> Result<(), EngineError> {
        if coin.amount.is_zero() {
            return Err(EngineError::InvalidAmount(format!(
                "coin {} must carry a positive amount",
                coin.id
            )));
        }

        let components = [coin.owner.as_str(), coin.id.as_str()];
        if self.coins.exists(inv, &components)? {
            return Err(EngineError::AlreadyExists(format!(
                "coin {} of {}",
                coin.id, coin.owner
            )));
        }

        self.coins.put(inv, &components, coin)?;
        inv.emit_event(events::CREATE_COIN, coin)?;

        tracing::debug!(
            owner = %coin.owner,
            id = %coin.id,
            amount = %coin.amount,
            via = %coin.created_via,
            "coin created"
        );
        Ok(())
    }

    /// Mint a new coin for `owner` at the invocation timestamp.
    pub fn mint(
        &self,
        inv: &mut Invocation<'_>,
        owner: &str,
        amount: Amount,
        via: Provenance,
    ) -> Result<Coin, EngineError> {
        self.mint_unspent(inv, owner, amount, via, &[])
    }

    /// Mint under an id that is neither stored nor in `spent`.
    fn mint_unspent(
        &self,
        inv: &mut Invocation<'_>,
        owner: &str,
        amount: Amount,
        via: Provenance,
        spent: &[String],
    ) -> Result<Coin, EngineError> {
        let id = self.next_coin_id(inv, owner, spent)?;
        let coin = Coin::new(id, owner, amount, via, inv.timestamp());
        self.create_coin(inv, &coin)?;
        Ok(coin)
    }

    /// Issue new value to `owner`. The only path besides direct coin
    /// creation that grows total supply.
    pub fn deposit(
        &self,
        inv: &mut Invocation<'_>,
        owner: &str,
        amount: Amount,
    ) -> Result<Coin, EngineError> {
        let coin = self.mint(inv, owner, amount, Provenance::Deposit)?;
        tracing::info!(owner, amount = %amount, id = %coin.id, "deposit");
        Ok(coin)
    }

    pub fn read_coin(&self, inv: &Invocation<'_>, owner: &str, id: &str) -> Result<Coin, EngineError> {
        self.coins
            .get(inv, &[owner, id])?
            .ok_or_else(|| EngineError::NotFound(format!("coin {} of {}", id, owner)))
    }

    /// All coins held by `owner`, in key order. Empty for an unknown owner.
    pub fn list_coins_by_owner(
        &self,
        inv: &Invocation<'_>,
        owner: &str,
    ) -> Result<Vec<Coin>, EngineError> {
        let mut coins = self.coins.scan(inv, &[owner])?;
        coins.retain(|c| c.owner == owner);
        Ok(coins)
    }

    pub fn total_balance(&self, inv: &Invocation<'_>, owner: &str) -> Result<Amount, EngineError> {
        let coins = self.list_coins_by_owner(inv, owner)?;
        Ok(Amount::checked_sum(coins.iter().map(|c| c.amount))?)
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// Coins are selected greedily in enumeration order until they cover
    /// `amount`. Every check happens before the first write, so a refused
    /// transfer leaves the payer's coins untouched.
    pub fn transfer(
        &self,
        inv: &mut Invocation<'_>,
        from: &str,
        to: &str,
        amount: Amount,
        reason: Provenance,
    ) -> Result<TransferReceipt, EngineError> {
        if amount.is_zero() {
            return Err(EngineError::InvalidAmount(
                "transfer amount must be positive".into(),
            ));
        }

        let coins = self.list_coins_by_owner(inv, from)?;
        if coins.is_empty() {
            return Err(EngineError::NoFunds(from.to_string()));
        }

        let mut selected = Amount::ZERO;
        let mut spent = Vec::new();
        for coin in coins {
            if selected >= amount {
                break;
            }
            selected = selected
                .checked_add(coin.amount)
                .ok_or_else(|| EngineError::InvalidAmount(format!("balance of {} overflows", from)))?;
            spent.push(coin.id);
        }

        if selected < amount {
            tracing::warn!(from, available = %selected, required = %amount, "transfer refused");
            return Err(EngineError::InsufficientBalance {
                available: selected,
                required: amount,
            });
        }

        tracing::debug!(from, coins = spent.len(), selected = %selected, "coins selected");

        for id in &spent {
            self.coins.delete(inv, &[from, id.as_str()])?;
        }

        // Spent ids are deleted in the overlay but must not be minted again.
        let credited = self.mint_unspent(inv, to, amount, reason, &spent)?;
        let change = match selected.checked_sub(amount) {
            Some(rest) if !rest.is_zero() => {
                Some(self.mint_unspent(inv, from, rest, Provenance::Change, &spent)?)
            }
            _ => None,
        };

        let receipt = TransferReceipt {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            reason,
            spent,
            credited,
            change,
        };
        inv.emit_event(events::TRANSFER, &receipt)?;

        tracing::info!(from, to, amount = %amount, reason = %reason, "transfer");
        Ok(receipt)
    }

    /// `Currency<owner><timestamp>`, suffixed `-N` with the smallest free
    /// `N` when that id is already taken or listed in `spent`.
    fn next_coin_id(
        &self,
        inv: &Invocation<'_>,
        owner: &str,
        spent: &[String],
    ) -> Result<String, EngineError> {
        let base = format!("{}{}{}", CURRENCY_TAG, owner, inv.timestamp());
        let taken = |id: &str| -> Result<bool, EngineError> {
            Ok(spent.iter().any(|s| s == id) || self.coins.exists(inv, &[owner, id])?)
        };
        if !taken(&base)? {
            return Ok(base);
        }
        let mut n: u64 = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !taken(&candidate)? {
                return Ok(candidate);
            }
            n += 1;
        }
    }
}

impl Default for CoinLedger {
    fn default() -> Self {
        Self::new()
    }
}
