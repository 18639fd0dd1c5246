//! Sentence pooling over token embeddings

use anyhow::{anyhow, Result};

use super::Embedding;

/// Masked mean pooling over a `[batch, seq_len, hidden]` tensor.
///
/// `attention_mask` is row-major `[batch, seq_len]`; padded positions (mask 0)
/// are left out of the average.
pub fn mean_pool(shape: &[i64], data: &[f32], attention_mask: &[i64]) -> Result<Vec<Embedding>> {
  if shape.len() != 3 {
    return Err(anyhow!("Expected a [batch, seq_len, hidden] tensor, got shape {shape:?}"));
  }

  let (batch, seq_len, hidden) = (shape[0] as usize, shape[1] as usize, shape[2] as usize);
  if data.len() != batch * seq_len * hidden {
    return Err(anyhow!(
      "Tensor data has {} values, shape {shape:?} needs {}",
      data.len(),
      batch * seq_len * hidden
    ));
  }
  if attention_mask.len() != batch * seq_len {
    return Err(anyhow!(
      "Attention mask has {} values, expected {}",
      attention_mask.len(),
      batch * seq_len
    ));
  }

  let pooled = (0..batch)
    .map(|row| {
      let mut embedding = vec![0.0f32; hidden];
      let mut tokens = 0.0f32;

      for token in 0..seq_len {
        if attention_mask[row * seq_len + token] == 0 {
          continue;
        }
        let start = (row * seq_len + token) * hidden;
        for (i, &value) in data[start..start + hidden].iter().enumerate() {
          embedding[i] += value;
        }
        tokens += 1.0;
      }

      let divisor = tokens.max(1e-9);
      for value in embedding.iter_mut() {
        *value /= divisor;
      }
      embedding
    })
    .collect();

  Ok(pooled)
}

/// Scale to unit length; zero vectors come back unchanged
pub fn normalize(mut embedding: Embedding) -> Embedding {
  let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();

  if magnitude < f32::EPSILON {
    return embedding;
  }

  for value in embedding.iter_mut() {
    *value /= magnitude;
  }
  embedding
}
