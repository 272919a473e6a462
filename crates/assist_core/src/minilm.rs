use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};
use std::path::Path;

use crate::embed::EmbeddingProvider;

// all-MiniLM-L6-v2 geometry. The checkpoint is always this exact
// architecture, so the numbers live here instead of a config file.
const HIDDEN_SIZE: usize = 384;
const INTERMEDIATE_SIZE: usize = 1536;
const NUM_HEADS: usize = 12;
const HEAD_DIM: usize = 32;
const NUM_LAYERS: usize = 6;
const VOCAB_SIZE: usize = 30522;
const MAX_POSITIONS: usize = 512;
const TYPE_VOCAB_SIZE: usize = 2;
const LAYER_NORM_EPS: f64 = 1e-12;

struct InputEmbeddings {
    word: Embedding,
    position: Embedding,
    token_type: Embedding,
    norm: LayerNorm,
}

impl InputEmbeddings {
    fn load(vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            word: embedding(VOCAB_SIZE, HIDDEN_SIZE, vb.pp("word_embeddings"))?,
            position: embedding(MAX_POSITIONS, HIDDEN_SIZE, vb.pp("position_embeddings"))?,
            token_type: embedding(TYPE_VOCAB_SIZE, HIDDEN_SIZE, vb.pp("token_type_embeddings"))?,
            norm: layer_norm(HIDDEN_SIZE, LAYER_NORM_EPS, vb.pp("LayerNorm"))?,
        })
    }

    /// (seq) token ids -> (seq, hidden), summed and normalized. All inputs
    /// are single-segment, so every token type id is 0.
    fn forward(&self, token_ids: &Tensor, device: &Device) -> Result<Tensor> {
        let seq_len = token_ids.dim(0)?;

        let positions: Vec<u32> = (0..seq_len as u32).collect();
        let positions = Tensor::new(positions.as_slice(), device)?;
        let types = Tensor::zeros(seq_len, DType::U32, device)?;

        let summed = ((self.word.forward(token_ids)? + self.position.forward(&positions)?)?
            + self.token_type.forward(&types)?)?;
        Ok(self.norm.forward(&summed)?)
    }
}

struct EncoderLayer {
    query: Linear,
    key: Linear,
    value: Linear,
    attn_out: Linear,
    attn_norm: LayerNorm,
    ffn_up: Linear,
    ffn_down: Linear,
    ffn_norm: LayerNorm,
}

impl EncoderLayer {
    fn load(vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            query: linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("attention.self.query"))?,
            key: linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("attention.self.key"))?,
            value: linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("attention.self.value"))?,
            attn_out: linear(HIDDEN_SIZE, HIDDEN_SIZE, vb.pp("attention.output.dense"))?,
            attn_norm: layer_norm(
                HIDDEN_SIZE,
                LAYER_NORM_EPS,
                vb.pp("attention.output.LayerNorm"),
            )?,
            ffn_up: linear(HIDDEN_SIZE, INTERMEDIATE_SIZE, vb.pp("intermediate.dense"))?,
            ffn_down: linear(INTERMEDIATE_SIZE, HIDDEN_SIZE, vb.pp("output.dense"))?,
            ffn_norm: layer_norm(HIDDEN_SIZE, LAYER_NORM_EPS, vb.pp("output.LayerNorm"))?,
        })
    }

    /// (hidden) projection -> (heads, seq, head_dim)
    fn split_heads(projected: Tensor, seq_len: usize) -> Result<Tensor> {
        Ok(projected
            .reshape((seq_len, NUM_HEADS, HEAD_DIM))?
            .transpose(0, 1)?
            .contiguous()?)
    }

    fn attention(&self, x: &Tensor) -> Result<Tensor> {
        let (seq_len, _) = x.dims2()?;

        let q = Self::split_heads(self.query.forward(x)?, seq_len)?;
        let k = Self::split_heads(self.key.forward(x)?, seq_len)?;
        let v = Self::split_heads(self.value.forward(x)?, seq_len)?;

        let scale = (HEAD_DIM as f64).sqrt();
        let scores = q.matmul(&k.transpose(1, 2)?)?.affine(1.0 / scale, 0.0)?;
        let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;

        let context = weights
            .matmul(&v)?
            .transpose(0, 1)?
            .contiguous()?
            .reshape((seq_len, HIDDEN_SIZE))?;

        let out = self.attn_out.forward(&context)?;
        // residual + post-norm, BERT style
        Ok(self.attn_norm.forward(&(x + out)?)?)
    }

    fn forward(&self, x: &Tensor) -> Result<Tensor> {
        let x = self.attention(x)?;
        let h = self.ffn_down.forward(&self.ffn_up.forward(&x)?.gelu_erf()?)?;
        Ok(self.ffn_norm.forward(&(&x + h)?)?)
    }
}

struct Encoder {
    embeddings: InputEmbeddings,
    layers: Vec<EncoderLayer>,
    device: Device,
}

impl Encoder {
    fn load(path: &Path, device: &Device) -> Result<Self> {
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)? };

        let embeddings = InputEmbeddings::load(vb.pp("embeddings"))?;
        let mut layers = Vec::with_capacity(NUM_LAYERS);
        for i in 0..NUM_LAYERS {
            layers.push(EncoderLayer::load(vb.pp(format!("encoder.layer.{i}")))?);
        }

        Ok(Self {
            embeddings,
            layers,
            device: device.clone(),
        })
    }

    /// Mean-pooled, L2-normalized sentence embedding.
    fn encode(&self, token_ids: &[u32]) -> Result<Vec<f32>> {
        let ids = Tensor::new(token_ids, &self.device)?;

        let mut hidden = self.embeddings.forward(&ids, &self.device)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden)?;
        }

        let pooled = hidden.mean(0)?;
        let norm: f32 = pooled.sqr()?.sum_all()?.sqrt()?.to_scalar()?;
        let pooled = if norm > 0.0 {
            pooled.affine(1.0 / f64::from(norm), 0.0)?
        } else {
            pooled
        };

        Ok(pooled.to_vec1::<f32>()?)
    }
}

/// Sentence embeddings from all-MiniLM-L6-v2, loaded from a safetensors
/// checkpoint and run on CPU through candle.
pub struct MiniLmEmbeddingProvider {
    encoder: Encoder,
    tokenizer: tokenizers::Tokenizer,
}

impl MiniLmEmbeddingProvider {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self> {
        let device = Device::Cpu;
        let encoder = Encoder::load(model_path, &device)?;
        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("load tokenizer: {e}"))?;

        Ok(Self { encoder, tokenizer })
    }
}

impl EmbeddingProvider for MiniLmEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenize: {e}"))?;

        // inputs longer than the position table are truncated, not rejected
        let mut token_ids = encoding.get_ids().to_vec();
        token_ids.truncate(MAX_POSITIONS);

        self.encoder.encode(&token_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_paths() -> Option<(PathBuf, PathBuf)> {
        let base = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()?
            .parent()?
            .join("models");
        let model = base.join("all-MiniLM-L6-v2.safetensors");
        let tokenizer = base.join("all-MiniLM-L6-v2-tokenizer.json");
        (model.exists() && tokenizer.exists()).then_some((model, tokenizer))
    }

    #[test]
    fn embeds_to_unit_length_384() {
        let Some((model, tokenizer)) = model_paths() else {
            eprintln!("Skipping: all-MiniLM-L6-v2 model or tokenizer not found");
            return;
        };

        let provider = MiniLmEmbeddingProvider::load(&model, &tokenizer).unwrap();
        let embedding = provider.embed("How can I upload a project?").unwrap();

        assert_eq!(embedding.len(), HIDDEN_SIZE);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "L2 norm should be ~1.0, got {norm}");
    }

    #[test]
    fn related_questions_embed_closer_than_unrelated() {
        let Some((model, tokenizer)) = model_paths() else {
            eprintln!("Skipping: all-MiniLM-L6-v2 model or tokenizer not found");
            return;
        };

        let provider = MiniLmEmbeddingProvider::load(&model, &tokenizer).unwrap();
        let upload = provider.embed("How can I upload a project?").unwrap();
        let related = provider.embed("Where do I add a new project?").unwrap();
        let unrelated = provider.embed("What is the weather like in Tokyo?").unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        assert!(dot(&upload, &related) > dot(&upload, &unrelated));
    }
}
