//! Deterministic feature-hashing embedder.
//!
//! Each text is broken into features: lowercase alphanumeric words (`w:`)
//! and the character trigrams of each padded word (`t:`), plus one constant
//! bias feature. Every feature adds ±1 to bucket `fnv1a(feature) % D`, with
//! the sign taken from bit 63 of the same hash. The sum is L2-normalized.
//!
//! Needs no model files, so it is the default backend and the one tests run
//! against. Similar wording lands near each other; meaning does not.

use super::Embedder;
use crate::error::EmbedError;
use crate::lexical::trigram::{padded_trigrams, words};
use anyhow::Result;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;
const BIAS_FEATURE: &str = "b:";

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    model_name: String,
    dimension: usize,
}

impl HashEmbedder {
    /// # Errors
    ///
    /// Returns [`EmbedError::ZeroDimension`] when `dimension` is 0.
    pub fn new(model_name: impl Into<String>, dimension: usize) -> Result<Self, EmbedError> {
        if dimension == 0 {
            return Err(EmbedError::ZeroDimension);
        }
        Ok(Self {
            model_name: model_name.into(),
            dimension,
        })
    }

    fn add_feature(&self, acc: &mut [f64], feature: &str) {
        let hash = fnv1a(feature.as_bytes());
        #[allow(clippy::cast_possible_truncation)]
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        acc[bucket] += sign;
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut acc = vec![0.0_f64; self.dimension];
        self.add_feature(&mut acc, BIAS_FEATURE);

        let lowered = text.to_lowercase();
        let mut feature = String::new();
        for word in words(&lowered) {
            feature.clear();
            feature.push_str("w:");
            feature.push_str(word);
            self.add_feature(&mut acc, &feature);

            for gram in padded_trigrams(word) {
                feature.clear();
                feature.push_str("t:");
                feature.extend(gram);
                self.add_feature(&mut acc, &feature);
            }
        }

        Ok(l2_normalize(&acc))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[allow(clippy::cast_possible_truncation)]
fn l2_normalize(acc: &[f64]) -> Vec<f32> {
    let norm = acc.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return acc.iter().map(|v| *v as f32).collect();
    }
    acc.iter().map(|v| (v / norm) as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::cosine_distance;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a(b""), FNV_OFFSET_BASIS);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert_eq!(
            HashEmbedder::new("m", 0).map(|_| ()),
            Err(EmbedError::ZeroDimension)
        );
    }

    #[test]
    fn output_is_unit_length_even_for_empty_text() {
        let embedder = HashEmbedder::new("m", 64).expect("embedder");
        for text in ["", "hello world", "星座：牡羊座"] {
            let v = embedder.embed(text).expect("embed");
            assert_eq!(v.len(), 64);
            assert!((norm(&v) - 1.0).abs() < 1e-5, "norm for {text:?}");
        }
    }

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashEmbedder::new("m", 128).expect("embedder");
        let a = embedder.embed("Authentication timeout").expect("embed");
        let b = embedder.embed("Authentication timeout").expect("embed");
        assert_eq!(a, b);
    }

    #[test]
    fn batch_matches_single_calls() {
        let embedder = HashEmbedder::new("m", 32).expect("embedder");
        let batch = embedder.embed_batch(&["one", "two"]).expect("batch");
        assert_eq!(batch[0], embedder.embed("one").expect("embed"));
        assert_eq!(batch[1], embedder.embed("two").expect("embed"));
    }

    #[test]
    fn case_is_ignored() {
        let embedder = HashEmbedder::new("m", 64).expect("embedder");
        assert_eq!(
            embedder.embed("Hello World").expect("embed"),
            embedder.embed("hello world").expect("embed")
        );
    }

    #[test]
    fn shared_words_are_closer_than_unrelated_text() {
        let embedder = HashEmbedder::new("m", 384).expect("embedder");
        let query = embedder.embed("authentication timeout").expect("embed");
        let near = embedder
            .embed("authentication timeout in worker sync")
            .expect("embed");
        let far = embedder.embed("readme typo cleanup").expect("embed");

        let near_d = cosine_distance(&query, &near).expect("distance");
        let far_d = cosine_distance(&query, &far).expect("distance");
        assert!(near_d < far_d, "near {near_d} vs far {far_d}");
    }
}
