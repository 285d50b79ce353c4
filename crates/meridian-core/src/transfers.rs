//! Transfer records and canonical per-token ordering
//!
//! A request body may carry fungible and non-fungible transfers for many
//! tokens. The wire format groups them per token, and the serialized result
//! must be byte-identical for logically equal input regardless of the order
//! transfers were added in, because the bytes feed a signed, hashed payload.
//! Canonicalization coalesces fungible duplicates, sorts both kinds, and
//! merges them into per-token groups in a single pass.

use crate::entity::{AccountId, TokenId};
use crate::errors::MeridianError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fungible transfer: a signed amount credited or debited to one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// The token being transferred
    pub token_id: TokenId,
    /// The account whose balance changes
    pub account_id: AccountId,
    /// Amount in the smallest denomination; negative debits the account
    pub amount: i64,
    /// Expected decimals of the token, validated by the network when set
    pub expected_decimals: Option<u32>,
    /// Whether this transfer spends an approved allowance
    pub approved: bool,
}

impl TokenTransfer {
    /// Create a plain transfer without decimals or allowance approval
    pub fn new(token_id: TokenId, account_id: AccountId, amount: i64) -> Self {
        Self {
            token_id,
            account_id,
            amount,
            expected_decimals: None,
            approved: false,
        }
    }

    fn coalesce_key(&self) -> (&TokenId, &AccountId, bool) {
        (&self.token_id, &self.account_id, self.approved)
    }
}

/// A non-fungible transfer: one serial moving between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftTransfer {
    /// The token type of the serial
    pub token_id: TokenId,
    /// The current owner
    pub sender: AccountId,
    /// The new owner
    pub receiver: AccountId,
    /// The serial number being moved
    pub serial: i64,
    /// Whether this transfer spends an approved allowance
    pub approved: bool,
}

/// The canonical per-token bundle of transfers in one request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferList {
    /// The token all contained transfers refer to
    pub token_id: TokenId,
    /// Expected decimals shared by the fungible transfers, when set
    pub expected_decimals: Option<u32>,
    /// Coalesced fungible transfers, canonically ordered
    pub transfers: Vec<TokenTransfer>,
    /// Non-fungible transfers, canonically ordered
    pub nft_transfers: Vec<NftTransfer>,
}

impl TokenTransferList {
    fn empty(token_id: TokenId, expected_decimals: Option<u32>) -> Self {
        Self {
            token_id,
            expected_decimals,
            transfers: Vec::new(),
            nft_transfers: Vec::new(),
        }
    }
}

/// Canonicalize transfer records into ordered per-token groups.
///
/// 1. Fungible records sharing `(token, account, approved)` are coalesced by
///    summing amounts. Two records setting different expected decimals for
///    the same token are a structural error, as is a coalesced amount
///    outside the `i64` range.
/// 2. Fungible records sort by `(token, account, approved)`; non-fungible
///    records by `(token, sender, receiver, serial)`.
/// 3. The two sorted sequences merge into per-token groups with two
///    cursors; a tie on token id opens one group consuming both sides.
///
/// The output is identical for any permutation of the inputs.
pub fn canonical_transfer_lists(
    fungible: Vec<TokenTransfer>,
    nft: Vec<NftTransfer>,
) -> Result<Vec<TokenTransferList>, MeridianError> {
    let mut decimals: BTreeMap<TokenId, u32> = BTreeMap::new();
    for transfer in &fungible {
        if let Some(new) = transfer.expected_decimals {
            match decimals.get(&transfer.token_id) {
                Some(previous) if *previous != new => {
                    return Err(MeridianError::DecimalsMismatch {
                        token: transfer.token_id.to_string(),
                        previous: *previous,
                        new,
                    });
                }
                _ => {
                    decimals.insert(transfer.token_id.clone(), new);
                }
            }
        }
    }

    let mut coalesced: Vec<TokenTransfer> = Vec::with_capacity(fungible.len());
    for mut transfer in fungible {
        transfer.expected_decimals = decimals.get(&transfer.token_id).copied();
        match coalesced
            .iter_mut()
            .find(|existing| existing.coalesce_key() == transfer.coalesce_key())
        {
            Some(existing) => {
                existing.amount = existing.amount.checked_add(transfer.amount).ok_or_else(|| {
                    MeridianError::AmountOverflow {
                        token: transfer.token_id.to_string(),
                        account: transfer.account_id.to_string(),
                    }
                })?;
            }
            None => coalesced.push(transfer),
        }
    }

    coalesced.sort_by(|a, b| {
        (&a.token_id, &a.account_id, a.approved).cmp(&(&b.token_id, &b.account_id, b.approved))
    });
    let mut nft = nft;
    nft.sort_by(|a, b| {
        (&a.token_id, &a.sender, &a.receiver, a.serial).cmp(&(
            &b.token_id,
            &b.sender,
            &b.receiver,
            b.serial,
        ))
    });

    let mut lists: Vec<TokenTransferList> = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);

    while i < coalesced.len() || j < nft.len() {
        // Append to the trailing group whenever the next record matches it.
        if let Some(last) = lists.last_mut() {
            if i < coalesced.len() && coalesced[i].token_id == last.token_id {
                last.transfers.push(coalesced[i].clone());
                i += 1;
                continue;
            }
            if j < nft.len() && nft[j].token_id == last.token_id {
                last.nft_transfers.push(nft[j].clone());
                j += 1;
                continue;
            }
        }

        let next_fungible = coalesced.get(i).map(|t| &t.token_id);
        let next_nft = nft.get(j).map(|t| &t.token_id);
        let token_id = match (next_fungible, next_nft) {
            (Some(f), Some(n)) => {
                if f <= n {
                    f.clone()
                } else {
                    n.clone()
                }
            }
            (Some(f), None) => f.clone(),
            (None, Some(n)) => n.clone(),
            (None, None) => break,
        };

        let mut list = TokenTransferList::empty(token_id.clone(), decimals.get(&token_id).copied());
        if next_fungible == Some(&token_id) {
            list.transfers.push(coalesced[i].clone());
            i += 1;
        }
        // A token-id tie consumes one record from each side into one group.
        if nft.get(j).map(|t| &t.token_id) == Some(&token_id) {
            list.nft_transfers.push(nft[j].clone());
            j += 1;
        }
        lists.push(list);
    }

    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization;
    use proptest::prelude::*;

    fn token(num: u64) -> TokenId {
        TokenId::from_num(num)
    }

    fn account(num: u64) -> AccountId {
        AccountId::from_num(num)
    }

    fn fungible(t: u64, a: u64, amount: i64) -> TokenTransfer {
        TokenTransfer::new(token(t), account(a), amount)
    }

    fn nft(t: u64, from: u64, to: u64, serial: i64) -> NftTransfer {
        NftTransfer {
            token_id: token(t),
            sender: account(from),
            receiver: account(to),
            serial,
            approved: false,
        }
    }

    #[test]
    fn coalesces_same_key_and_groups_with_nfts() {
        // +5 and -2 for the same (token, account, approval) coalesce to +3,
        // grouped with the NFT transfer of the same token.
        let lists = canonical_transfer_lists(
            vec![fungible(1, 10, 5), fungible(1, 10, -2)],
            vec![nft(1, 10, 11, 7)],
        )
        .unwrap();

        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].token_id, token(1));
        assert_eq!(lists[0].transfers.len(), 1);
        assert_eq!(lists[0].transfers[0].amount, 3);
        assert_eq!(lists[0].nft_transfers.len(), 1);
        assert_eq!(lists[0].nft_transfers[0].serial, 7);
    }

    #[test]
    fn approval_flag_prevents_coalescing() {
        let approved = TokenTransfer {
            approved: true,
            ..fungible(1, 10, 5)
        };
        let lists =
            canonical_transfer_lists(vec![fungible(1, 10, 5), approved], Vec::new()).unwrap();
        assert_eq!(lists[0].transfers.len(), 2);
    }

    #[test]
    fn groups_are_ordered_by_token_id() {
        let lists = canonical_transfer_lists(
            vec![fungible(3, 1, 1), fungible(1, 1, 1)],
            vec![nft(2, 1, 2, 1)],
        )
        .unwrap();
        let tokens: Vec<u64> = lists.iter().map(|l| l.token_id.0.num).collect();
        assert_eq!(tokens, vec![1, 2, 3]);
    }

    #[test]
    fn fungible_transfers_within_a_group_sort_by_account() {
        let lists = canonical_transfer_lists(
            vec![fungible(1, 30, 1), fungible(1, 10, 1), fungible(1, 20, 1)],
            Vec::new(),
        )
        .unwrap();
        let accounts: Vec<u64> = lists[0].transfers.iter().map(|t| t.account_id.0.num).collect();
        assert_eq!(accounts, vec![10, 20, 30]);
    }

    #[test]
    fn nft_transfers_sort_by_sender_receiver_serial() {
        let lists = canonical_transfer_lists(
            Vec::new(),
            vec![nft(1, 2, 3, 9), nft(1, 1, 3, 4), nft(1, 1, 2, 8)],
        )
        .unwrap();
        let serials: Vec<i64> = lists[0].nft_transfers.iter().map(|t| t.serial).collect();
        assert_eq!(serials, vec![8, 4, 9]);
    }

    #[test]
    fn coalescing_overflow_is_an_error() {
        let err = canonical_transfer_lists(
            vec![fungible(1, 10, i64::MAX), fungible(1, 10, 1)],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, MeridianError::AmountOverflow { .. }));

        // The negative direction overflows too.
        let err = canonical_transfer_lists(
            vec![fungible(1, 10, i64::MIN), fungible(1, 10, -1)],
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, MeridianError::AmountOverflow { .. }));
    }

    #[test]
    fn conflicting_decimals_is_an_error() {
        let mut a = fungible(1, 10, 5);
        a.expected_decimals = Some(2);
        let mut b = fungible(1, 11, 5);
        b.expected_decimals = Some(6);
        let err = canonical_transfer_lists(vec![a, b], Vec::new()).unwrap_err();
        assert!(matches!(err, MeridianError::DecimalsMismatch { .. }));
    }

    #[test]
    fn decimals_propagate_to_the_group() {
        let mut a = fungible(1, 10, 5);
        a.expected_decimals = Some(2);
        let lists = canonical_transfer_lists(vec![a, fungible(1, 11, -5)], Vec::new()).unwrap();
        assert_eq!(lists[0].expected_decimals, Some(2));
        assert_eq!(lists[0].transfers[1].expected_decimals, Some(2));
    }

    proptest! {
        // Canonicalization must be insensitive to input order: any
        // permutation of the same records yields byte-identical groups.
        #[test]
        fn output_is_permutation_invariant(
            fungible_raw in prop::collection::vec(
                (0u64..4, 0u64..4, -50i64..50, any::<bool>()), 0..12),
            nft_raw in prop::collection::vec(
                (0u64..4, 0u64..3, 0u64..3, 0i64..6, any::<bool>()), 0..8),
            seed in any::<u64>(),
        ) {
            let fungibles: Vec<TokenTransfer> = fungible_raw
                .iter()
                .map(|(t, a, amount, approved)| TokenTransfer {
                    token_id: token(*t),
                    account_id: account(*a),
                    amount: *amount,
                    expected_decimals: None,
                    approved: *approved,
                })
                .collect();
            let nfts: Vec<NftTransfer> = nft_raw
                .iter()
                .map(|(t, from, to, serial, approved)| NftTransfer {
                    token_id: token(*t),
                    sender: account(*from),
                    receiver: account(*to),
                    serial: *serial,
                    approved: *approved,
                })
                .collect();

            let mut shuffled_fungibles = fungibles.clone();
            let mut shuffled_nfts = nfts.clone();
            // Deterministic shuffle driven by the seed.
            let mut state = seed;
            for k in (1..shuffled_fungibles.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                shuffled_fungibles.swap(k, (state % (k as u64 + 1)) as usize);
            }
            for k in (1..shuffled_nfts.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                shuffled_nfts.swap(k, (state % (k as u64 + 1)) as usize);
            }

            let original = canonical_transfer_lists(fungibles, nfts).unwrap();
            let permuted = canonical_transfer_lists(shuffled_fungibles, shuffled_nfts).unwrap();

            prop_assert_eq!(
                serialization::to_vec(&original).unwrap(),
                serialization::to_vec(&permuted).unwrap()
            );
        }
    }
}
