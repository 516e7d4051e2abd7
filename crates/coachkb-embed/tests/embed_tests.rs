use coachkb_core::config::EmbeddingSettings;
use coachkb_core::traits::Embedder;
use coachkb_embed::{dot, get_default_embedder, require_embedder, FakeEmbedder, FAKE_DIM};
use secrecy::SecretString;

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { use_fake: true, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), FAKE_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
    assert!(embedder.model_id().starts_with("fake:"));
}

#[test]
fn fake_embedder_places_shared_words_closer() {
    let embedder = FakeEmbedder::new(128);
    let embs = embedder
        .embed_batch(&["Led payments migration".to_string(), "payments migration plan".to_string(), "team offsite".to_string()])
        .expect("embed");
    assert!(dot(&embs[0], &embs[1]) > dot(&embs[0], &embs[2]));
}

#[test]
fn fake_embedder_empty_text_is_zero_vector() {
    let embs = FakeEmbedder::new(8).embed_batch(&["  ".to_string()]).expect("embed");
    assert!(embs[0].iter().all(|x| *x == 0.0));
}

#[test]
fn require_embedder_without_credential_is_unavailable() {
    let settings = EmbeddingSettings::default();
    let err = require_embedder(&settings).err().expect("must fail");
    assert!(err.is_unavailable());

    let configured = EmbeddingSettings { api_key: Some(SecretString::new("sk-test".to_string())), ..EmbeddingSettings::default() };
    let embedder = require_embedder(&configured).expect("configured embedder");
    assert_eq!(embedder.model_id(), "text-embedding-3-small");
}

#[test]
fn default_embedder_without_credential_fails_on_first_call() {
    let embedder = get_default_embedder(&EmbeddingSettings::default()).expect("construction succeeds");
    let err = embedder.embed_batch(&["anything".to_string()]).unwrap_err();
    assert!(err.is_unavailable());
}
