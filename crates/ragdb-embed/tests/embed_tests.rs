use std::path::Path;

use ragdb_core::config::{EmbeddingBackend, EmbeddingSettings};
use ragdb_core::traits::Embedder;
use ragdb_embed::{get_default_embedder, FakeEmbedder};

fn l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Fake, fake_dim: 64, ..Default::default() };
    let embedder = get_default_embedder(&settings, Path::new("/nonexistent")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");

    assert_eq!(embedder.dim(), 64);
    assert_eq!(embs[0].len(), 64);
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    assert_eq!(embs[0], embs[1]);
}

#[test]
fn shared_words_are_closer() {
    let e = FakeEmbedder::new(384);
    let q = e.embed_query("lancedb vector index").unwrap();
    let near = e.embed_query("the vector index on lancedb").unwrap();
    let far = e.embed_query("banana bread recipe").unwrap();
    assert!(l2(&q, &near) < l2(&q, &far));
}

#[test]
fn empty_text_still_has_unit_norm() {
    let v = FakeEmbedder::new(8).embed_query("   ").unwrap();
    assert_eq!(v.len(), 8);
    assert!((v.iter().map(|x| x * x).sum::<f32>() - 1.0).abs() < 1e-6);
}

#[test]
fn missing_local_model_is_an_error() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Local, ..Default::default() };
    let tmp = tempfile::TempDir::new().unwrap();
    assert!(get_default_embedder(&settings, tmp.path()).is_err());
}
