//! Post-parse resolution of `${NAME}` markers recorded during value reading
//! (spec.md §4.5).
//!
//! Finalization runs once, after every pair has been parsed, so a reference
//! may point at a pair defined later in the file (spec.md §5, "forward
//! references resolve"). Rather than mutate [`crate::pair::PairList`] values
//! in place while also reading from it (borrowing one entry mutably while
//! reading arbitrary other entries doesn't hold up), this rebuilds each
//! value into a fresh buffer over a private snapshot of keys/values — the
//! alternative spec.md §9 explicitly allows ("implementers may instead
//! rebuild the value into a fresh buffer").

use std::collections::HashSet;

use memchr::memchr;

use crate::escape::preceded_by_odd_backslashes;
use crate::options::ParserOptions;
use crate::pair::PairList;
use crate::span::VariablePosition;

/// Resolves every recorded interpolation across `pairs` in place.
///
/// `lookup` is consulted before the parsed pairs for each variable name; if
/// it returns `Ok(None)` the name is looked for among `pairs` instead.
/// Missing names expand to an empty byte string. Recursion into a
/// substituted value's own markers is bounded by
/// `opts.max_interpolation_depth`, and a per-chain visited-name set breaks
/// cycles by resolving any re-entrant name to empty (spec.md §4.5, §8
/// property 5).
pub(crate) fn finalize<E>(
    pairs: &mut PairList,
    opts: &ParserOptions,
    mut lookup: impl FnMut(&[u8]) -> Result<Option<Vec<u8>>, E>,
) -> Result<(), E> {
    if !opts.interpolation_enabled {
        for pair in pairs.iter_mut() {
            pair.interpolations.clear();
        }
        return Ok(());
    }

    let keys: Vec<Vec<u8>> = pairs.iter().map(|p| p.key().to_vec()).collect();
    let mut values: Vec<Vec<u8>> = pairs.iter().map(|p| p.value().to_vec()).collect();
    let positions: Vec<Vec<VariablePosition>> =
        pairs.iter().map(|p| p.interpolations.clone()).collect();

    for index in 0..values.len() {
        // Right-to-left so earlier, still-unprocessed positions in this
        // value stay valid as later ones are spliced and shift the buffer.
        for pos in positions[index].iter().rev() {
            let name = pos.name_slice(&values[index]).to_vec();
            let mut visited = HashSet::new();
            visited.insert(keys[index].clone());
            let resolved = resolve(&name, opts, &keys, &values, &mut lookup, &mut visited, 1)?;
            values[index].splice(pos.marker_range(), resolved);
        }
    }

    for (pair, value) in pairs.iter_mut().zip(values) {
        *pair.value_mut() = value;
        pair.interpolations.clear();
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn resolve<E>(
    name: &[u8],
    opts: &ParserOptions,
    keys: &[Vec<u8>],
    values: &[Vec<u8>],
    lookup: &mut impl FnMut(&[u8]) -> Result<Option<Vec<u8>>, E>,
    visited: &mut HashSet<Vec<u8>>,
    depth: u32,
) -> Result<Vec<u8>, E> {
    if depth > opts.max_interpolation_depth || visited.contains(name) {
        return Ok(Vec::new());
    }
    visited.insert(name.to_vec());

    let mut resolved = match lookup(name)? {
        Some(bytes) => bytes,
        None => lookup_in_pairs(name, keys, values).unwrap_or_default(),
    };

    for marker in find_markers(&resolved).iter().rev() {
        let inner_name = marker.name_slice(&resolved).to_vec();
        let inner = resolve(&inner_name, opts, keys, values, lookup, visited, depth + 1)?;
        resolved.splice(marker.marker_range(), inner);
    }

    visited.remove(name);
    Ok(resolved)
}

fn lookup_in_pairs(name: &[u8], keys: &[Vec<u8>], values: &[Vec<u8>]) -> Option<Vec<u8>> {
    keys.iter()
        .zip(values.iter())
        .rev()
        .find(|(key, _)| key.as_slice() == name)
        .map(|(_, value)| value.clone())
}

/// Scans an arbitrary byte slice (a lookup result, not necessarily one we
/// parsed ourselves) for unescaped `${NAME}` markers.
fn find_markers(bytes: &[u8]) -> Vec<VariablePosition> {
    let mut positions = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'$' && bytes[i + 1] == b'{' && !preceded_by_odd_backslashes(bytes, i) {
            if let Some(offset) = memchr(b'}', &bytes[i + 2..]) {
                let end = i + 2 + offset + 1;
                positions.push(VariablePosition { start: i, end });
                i = end;
                continue;
            }
        }
        i += 1;
    }
    positions
}
