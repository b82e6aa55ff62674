use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

pub struct Batch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Tokenize, truncate to `max_len` and right-pad every row to the longest one.
pub fn tokenize_batch(tokenizer: &Tokenizer, texts: &[String], max_len: usize, device: &Device) -> Result<Batch> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("tokenization failed: {e}"))?;
    let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);

    let rows: Vec<(Vec<u32>, Vec<u32>)> = encodings
        .iter()
        .map(|enc| {
            let n = enc.get_ids().len().min(max_len);
            (enc.get_ids()[..n].to_vec(), enc.get_attention_mask()[..n].to_vec())
        })
        .collect();
    let width = rows.iter().map(|(ids, _)| ids.len()).max().unwrap_or(0).max(1);

    let mut ids = Vec::with_capacity(rows.len() * width);
    let mut mask = Vec::with_capacity(rows.len() * width);
    for (row_ids, row_mask) in &rows {
        let pad = width - row_ids.len();
        ids.extend(row_ids.iter().copied().chain(std::iter::repeat(pad_id).take(pad)));
        mask.extend(row_mask.iter().copied().chain(std::iter::repeat(0).take(pad)));
    }

    let shape = (rows.len(), width);
    let input_ids = Tensor::from_vec(ids, shape, device)?;
    let attention_mask = Tensor::from_vec(mask, shape, device)?;
    let token_type_ids = input_ids.zeros_like()?;
    Ok(Batch { input_ids, token_type_ids, attention_mask })
}
