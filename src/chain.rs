//! Indexed-parameter-family ("chain") operations over one template.
//!
//! A chain is a logical ordered list stored under a key family such as
//! `head`, `head2`, `head3`, ... or purely numeric `2`, `3`, `4`, ... The
//! functions here always re-derive positions from the template's ordered
//! parameter list; nothing is cached, so a prior add/remove can never leave a
//! dangling index.
//!
//! Position 1 may live under any of the caller's alias keys or under
//! `prefix1`; more than one populated candidate is an alias conflict. A
//! missing or empty member between populated ones is a "hole", handled per
//! [`HolePolicy`].

use crate::error::ChainError;
use crate::template::{AddOpts, Template};

/// How far past the end of the new value list `set_chain` looks for stale
/// higher-numbered keys to remove. Inherited limit, not a meaningful
/// constant; use [`set_chain_with_lookahead`] to override.
pub const DEFAULT_CLEANUP_LOOKAHEAD: usize = 30;

/// Largest logical position accepted from page data. The fetched list is
/// sized by the highest position present, so a typo'd key like
/// `head9999999999=x` must error out instead of driving the allocation.
pub const MAX_CHAIN_POSITION: usize = 1000;

/// What to do when a chain has an unset position before a set one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolePolicy {
    /// Drop the hole, renumbering the logical list.
    Close,
    /// Keep an explicit `None` placeholder at the hole's position.
    Allow,
    /// Report the hole as an error.
    Disallow,
}

/// Resolved naming convention for one chain.
struct ChainKeys {
    aliases: Vec<String>,
    prefix: String,
    /// Pure numeric family: keys are `base`, `base+1`, ... and `prefix` is
    /// unused.
    numeric_base: Option<usize>,
}

impl ChainKeys {
    fn resolve(first_keys: &[&str], prefix: Option<&str>) -> Result<ChainKeys, ChainError> {
        if first_keys.is_empty() || first_keys.iter().any(|k| k.is_empty()) {
            return Err(ChainError::EmptyKey);
        }
        if prefix == Some("") {
            return Err(ChainError::EmptyPrefix);
        }
        let numeric_base = if first_keys.len() == 1 {
            first_keys[0].parse::<usize>().ok()
        } else {
            None
        };
        Ok(ChainKeys {
            aliases: first_keys.iter().map(|k| k.to_string()).collect(),
            prefix: prefix.unwrap_or(first_keys[0]).to_string(),
            numeric_base,
        })
    }

    /// Canonical key for 1-based logical position `i`.
    fn key_for(&self, i: usize) -> String {
        match self.numeric_base {
            Some(base) => (base + i - 1).to_string(),
            None if i == 1 => self.aliases[0].clone(),
            None => format!("{}{}", self.prefix, i),
        }
    }

    /// Forced showkey for newly created keys. A numeric family not starting
    /// at 1 must write `3=`, `4=`, ... explicitly or the positional meaning
    /// shifts on reparse.
    fn forced_showkey(&self) -> Option<bool> {
        match self.numeric_base {
            Some(base) if base != 1 => Some(true),
            _ => None,
        }
    }

    /// Logical position of `key` within this family, if it belongs to it.
    fn position_of(&self, key: &str) -> Option<usize> {
        if let Some(base) = self.numeric_base {
            let n = key.parse::<usize>().ok()?;
            return if n >= base { Some(n - base + 1) } else { None };
        }
        if self.aliases.iter().any(|a| a == key) {
            return Some(1);
        }
        let digits = key.strip_prefix(&self.prefix)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let n: usize = digits.parse().ok()?;
        // prefix1 is position 1; prefix0 is not part of the family
        if n >= 1 {
            Some(n)
        } else {
            None
        }
    }

    /// Every key of this family that is physically present on `t`, with its
    /// logical position, in parameter order.
    fn present_keys(&self, t: &Template) -> Vec<(usize, String)> {
        t.params()
            .filter_map(|p| self.position_of(p.key()).map(|i| (i, p.key().to_string())))
            .collect()
    }

    /// Like [`ChainKeys::present_keys`], rejecting positions past
    /// [`MAX_CHAIN_POSITION`]. This is a page data condition, so the batch
    /// driver skips the page rather than aborting.
    fn checked_present_keys(&self, t: &Template) -> Result<Vec<(usize, String)>, ChainError> {
        let present = self.present_keys(t);
        for (i, key) in &present {
            if *i > MAX_CHAIN_POSITION {
                return Err(ChainError::PositionOutOfRange {
                    key: key.clone(),
                    position: *i,
                });
            }
        }
        Ok(present)
    }

    /// The key actually holding position 1 on `t`, checking for alias
    /// conflicts (more than one populated candidate).
    fn first_position_key(&self, t: &Template) -> Result<Option<String>, ChainError> {
        let populated: Vec<String> = self
            .present_keys(t)
            .into_iter()
            .filter(|(i, key)| *i == 1 && !t.get(key).is_empty())
            .map(|(_, key)| key)
            .collect();
        if populated.len() > 1 {
            return Err(ChainError::AliasConflict { keys: populated });
        }
        Ok(populated.into_iter().next())
    }
}

/// Read the chain as an ordered value list. Empty-string values count as
/// holes. With [`HolePolicy::Close`] and [`HolePolicy::Disallow`] every
/// returned element is `Some`.
pub fn fetch_chain(
    t: &Template,
    first_keys: &[&str],
    prefix: Option<&str>,
    policy: HolePolicy,
) -> Result<Vec<Option<String>>, ChainError> {
    let keys = ChainKeys::resolve(first_keys, prefix)?;
    keys.first_position_key(t)?;

    let mut max = 0;
    let mut by_position: Vec<(usize, String)> = Vec::new();
    for (i, key) in keys.checked_present_keys(t)? {
        let value = t.get(&key);
        if !value.is_empty() {
            by_position.push((i, value.to_string()));
            max = max.max(i);
        }
    }

    let mut list: Vec<Option<String>> = vec![None; max];
    for (i, value) in by_position {
        list[i - 1] = Some(value);
    }
    match policy {
        HolePolicy::Allow => Ok(list),
        HolePolicy::Close => Ok(list.into_iter().filter(|v| v.is_some()).collect()),
        HolePolicy::Disallow => {
            if let Some(hole) = list.iter().position(|v| v.is_none()) {
                Err(ChainError::Hole { position: hole + 1 })
            } else {
                Ok(list)
            }
        }
    }
}

/// Add one value after the last populated position. The new parameter is
/// inserted physically adjacent to the existing chain members, not at the
/// very end of the template, so repeated bot runs produce minimal diffs.
pub fn append_to_chain(
    t: &mut Template,
    value: &str,
    first_keys: &[&str],
    prefix: Option<&str>,
) -> Result<(), ChainError> {
    let keys = ChainKeys::resolve(first_keys, prefix)?;
    keys.first_position_key(t)?;

    let mut last: Option<(usize, String)> = None;
    for (i, key) in keys.checked_present_keys(t)? {
        if !t.get(&key).is_empty() && last.as_ref().map_or(true, |(li, _)| i > *li) {
            last = Some((i, key));
        }
    }
    match last {
        None => {
            t.add_opts(
                &keys.key_for(1),
                value,
                AddOpts {
                    showkey: keys.forced_showkey(),
                    ..AddOpts::new()
                },
            );
        }
        Some((i, last_key)) => {
            let new_key = keys.key_for(i + 1);
            let showkey = t
                .param_index(&last_key)
                .and_then(|idx| t.params().nth(idx))
                .map(|p| p.showkey());
            let after = t
                .param_index(&last_key)
                .and_then(|idx| t.key_at(idx + 1))
                .map(|k| k.to_string());
            t.add_opts(
                &new_key,
                value,
                AddOpts {
                    showkey,
                    before: after.as_deref(),
                    ..AddOpts::new()
                },
            );
        }
    }
    Ok(())
}

/// Delete every member of the family, populated or not.
pub fn remove_chain(
    t: &mut Template,
    first_keys: &[&str],
    prefix: Option<&str>,
) -> Result<(), ChainError> {
    let keys = ChainKeys::resolve(first_keys, prefix)?;
    for (_, key) in keys.present_keys(t) {
        t.remove(&key);
    }
    Ok(())
}

/// Replace the whole family with exactly `values`, cleaning up stale
/// higher-numbered keys up to [`DEFAULT_CLEANUP_LOOKAHEAD`] past the new end.
pub fn set_chain(
    t: &mut Template,
    values: &[&str],
    first_keys: &[&str],
    prefix: Option<&str>,
) -> Result<(), ChainError> {
    set_chain_with_lookahead(t, values, first_keys, prefix, DEFAULT_CLEANUP_LOOKAHEAD)
}

pub fn set_chain_with_lookahead(
    t: &mut Template,
    values: &[&str],
    first_keys: &[&str],
    prefix: Option<&str>,
    lookahead: usize,
) -> Result<(), ChainError> {
    let keys = ChainKeys::resolve(first_keys, prefix)?;
    keys.checked_present_keys(t)?;
    let existing_first = keys.first_position_key(t)?;

    for (slot, value) in values.iter().enumerate() {
        let i = slot + 1;
        let key = if i == 1 {
            existing_first.clone().unwrap_or_else(|| keys.key_for(1))
        } else {
            keys.key_for(i)
        };
        if t.has(&key) {
            t.add(&key, value);
            continue;
        }
        // place the new key right after the previous chain member; a new
        // first member goes ahead of the lowest existing one instead, so a
        // leading hole closes in place rather than at the template's end
        let after = if i == 1 {
            keys.present_keys(t)
                .into_iter()
                .min_by_key(|(pos, _)| *pos)
                .map(|(_, key)| key)
        } else {
            let prev_key = if i == 2 {
                existing_first.clone().or_else(|| {
                    let k = keys.key_for(1);
                    t.has(&k).then_some(k)
                })
            } else {
                Some(keys.key_for(i - 1))
            };
            prev_key
                .and_then(|pk| t.param_index(&pk))
                .and_then(|idx| t.key_at(idx + 1))
                .map(|k| k.to_string())
        };
        t.add_opts(
            &key,
            value,
            AddOpts {
                showkey: keys.forced_showkey(),
                before: after.as_deref(),
                ..AddOpts::new()
            },
        );
    }

    // remove now-unused keys: every family member past the new end, bounded
    // by the lookahead
    let stale: Vec<String> = keys
        .present_keys(t)
        .into_iter()
        .filter(|(i, _)| *i > values.len() && *i <= values.len() + lookahead)
        .map(|(_, key)| key)
        .collect();
    for key in stale {
        t.remove(&key);
    }
    Ok(())
}
