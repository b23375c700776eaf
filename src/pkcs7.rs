/// PKCS#7 padding and padding validation
use crate::error::PaddingError;

/// Pad `data` up to the next multiple of `block_size`.
///
/// Data that is already block aligned gets a full block of padding, so the
/// result is always strictly longer than the input.
///
/// # Panics
///
/// Panics if `block_size` is zero.
pub fn add_padding(data: &[u8], block_size: u8) -> Vec<u8> {
    assert!(block_size > 0, "block size must be non-zero");
    let n_pad = block_size - (data.len() % block_size as usize) as u8;
    let mut out = Vec::with_capacity(data.len() + n_pad as usize);
    out.extend_from_slice(data);
    (0..n_pad).for_each(|_| out.push(n_pad));
    out
}

/// Strip PKCS#7 padding from `data`, failing if the trailing bytes are not a
/// valid pad.
pub fn remove_padding(data: &[u8]) -> Result<Vec<u8>, PaddingError> {
    let n_pad = padding_len(data).ok_or(PaddingError::InvalidPadding)?;
    Ok(data[..data.len() - n_pad].to_vec())
}

pub(crate) fn is_padded(data: &[u8]) -> bool {
    padding_len(data).is_some()
}

fn padding_len(data: &[u8]) -> Option<usize> {
    let n_pad = *data.last()? as usize;
    if n_pad == 0 || n_pad > data.len() {
        return None;
    }
    let padded = &data[(data.len() - n_pad)..];
    if padded.iter().all(|&el| el as usize == n_pad) {
        return Some(n_pad);
    }
    None
}
