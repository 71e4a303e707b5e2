//! Structure block tokenizer.

use core::ffi::CStr;

use crate::FdtError;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Token<'a> {
    BeginNode(&'a str),
    EndNode,
    Prop { name_offset: u32, value: &'a [u8] },
    End,
}

fn be32(bytes: &[u8], offset: usize) -> Option<u32> {
    let bytes = bytes.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_be_bytes(bytes.try_into().ok()?))
}

/// Reads the token at `offset`, skipping `FDT_NOP`s.
///
/// Returns the token and the offset of the token that follows it.
pub(crate) fn read(structs: &[u8], mut offset: usize) -> Result<(Token<'_>, usize), FdtError> {
    loop {
        let bad = FdtError::BadStructure(offset);
        let tag = be32(structs, offset).ok_or(bad)?;
        let body = offset + 4;

        match tag {
            FDT_NOP => offset = body,
            FDT_BEGIN_NODE => {
                let rest = structs.get(body..).ok_or(bad)?;
                let Ok(name) = CStr::from_bytes_until_nul(rest) else {
                    return Err(bad);
                };
                let Ok(name) = name.to_str() else {
                    return Err(bad);
                };
                let next = (body + name.len() + 1)
                    .checked_next_multiple_of(4)
                    .ok_or(bad)?;
                return Ok((Token::BeginNode(name), next));
            }
            FDT_PROP => {
                let len = be32(structs, body).ok_or(bad)?;
                let name_offset = be32(structs, body + 4).ok_or(bad)?;
                let start = body + 8;
                let end = usize::try_from(len)
                    .ok()
                    .and_then(|len| start.checked_add(len))
                    .ok_or(bad)?;
                let value = structs.get(start..end).ok_or(bad)?;
                let next = end.checked_next_multiple_of(4).ok_or(bad)?;
                return Ok((Token::Prop { name_offset, value }, next));
            }
            FDT_END_NODE => return Ok((Token::EndNode, body)),
            FDT_END => return Ok((Token::End, body)),
            _ => return Err(bad),
        }
    }
}

/// Walks the whole structure block once.
///
/// Checks that there is exactly one root node, that nodes are balanced, that
/// every property lives inside a node and names an existing string, and that
/// the block is terminated by `FDT_END`.
pub(crate) fn check_structure(structs: &[u8], strings: &[u8]) -> Result<(), FdtError> {
    let mut offset = 0;
    let mut depth = 0_usize;
    let mut seen_root = false;

    loop {
        let (token, next) = read(structs, offset)?;
        let bad = FdtError::BadStructure(offset);
        match token {
            Token::BeginNode(_) => {
                if depth == 0 && seen_root {
                    return Err(bad);
                }
                seen_root = true;
                depth += 1;
            }
            Token::EndNode => depth = depth.checked_sub(1).ok_or(bad)?,
            Token::Prop { name_offset, .. } => {
                if depth == 0 || string_at(strings, name_offset).is_none() {
                    return Err(bad);
                }
            }
            Token::End => {
                if depth != 0 || !seen_root {
                    return Err(bad);
                }
                return Ok(());
            }
        }
        offset = next;
    }
}

pub(crate) fn string_at(strings: &[u8], offset: u32) -> Option<&str> {
    let rest = strings.get(usize::try_from(offset).ok()?..)?;
    CStr::from_bytes_until_nul(rest).ok()?.to_str().ok()
}
