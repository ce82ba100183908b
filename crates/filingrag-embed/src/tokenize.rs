use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Tokenizes a batch of texts into `[B, max_len]` id and attention-mask
/// tensors, truncating long sequences and padding short ones (pad id 1,
/// mask 0).
pub fn tokenize_batch_on_device(
    tokenizer: &Tokenizer,
    texts: &[String],
    max_len: usize,
    device: &Device,
) -> Result<(Tensor, Tensor)> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

    let batch = texts.len();
    let mut ids_flat: Vec<u32> = Vec::with_capacity(batch * max_len);
    let mut mask_flat: Vec<u32> = Vec::with_capacity(batch * max_len);
    for enc in &encodings {
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > max_len {
            ids.truncate(max_len);
            mask.truncate(max_len);
        }
        if ids.len() < max_len {
            let pad = max_len - ids.len();
            ids.extend(std::iter::repeat(1).take(pad));
            mask.extend(std::iter::repeat(0).take(pad));
        }
        ids_flat.extend(ids);
        mask_flat.extend(mask);
    }

    let input_ids = Tensor::from_vec(ids_flat, (batch, max_len), device)?;
    let attention_mask = Tensor::from_vec(mask_flat, (batch, max_len), device)?;
    Ok((input_ids, attention_mask))
}
