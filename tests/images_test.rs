//! Integration tests for record photo uploads.

mod common;

use common::{file_part, jpeg_bytes, png_bytes, split_reference, test_config, TestHarness, BUCKET};
use reqwest::multipart::Form;
use serde_json::{json, Value};

fn record_form(name: &str) -> Form {
    Form::new()
        .text("contributor_name", name.to_string())
        .text("points", "3")
        .text("note", "with photo")
}

#[tokio::test]
async fn create_record_with_image_uploads_to_bucket() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(png_bytes(40, 20), "sink.png", "image/png"));
    let resp = h.post_multipart("/api/records/add/", form).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let reference = body["image"].as_str().unwrap();
    let (bucket, key) = split_reference(reference);
    assert_eq!(bucket, BUCKET);
    assert!(key.ends_with(".png"));
    // uuid + ".png"
    assert_eq!(key.len(), 36 + 4);

    let object = h.store.object(&bucket, &key).unwrap();
    assert_eq!(object.content_type, "image/png");
    let decoded = image::load_from_memory(&object.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (40, 20));
}

#[tokio::test]
async fn large_image_is_downscaled() {
    let mut config = test_config();
    config.images.max_dimension = 64;
    let h = TestHarness::with_server_config(config).await;

    let form = record_form("Ann").part("image", file_part(jpeg_bytes(256, 128), "big.jpg", "image/jpeg"));
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let (bucket, key) = split_reference(body["image"].as_str().unwrap());
    assert!(key.ends_with(".jpg"));

    let object = h.store.object(&bucket, &key).unwrap();
    assert_eq!(object.content_type, "image/jpeg");
    let decoded = image::load_from_memory(&object.data).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 32));
}

#[tokio::test]
async fn misnamed_upload_gets_extension_of_its_format() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(png_bytes(12, 12), "photo.jpg", "image/jpeg"));
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let (bucket, key) = split_reference(body["image"].as_str().unwrap());
    assert!(key.ends_with(".png"), "{key}");
    assert_eq!(h.store.object(&bucket, &key).unwrap().content_type, "image/png");
}

#[tokio::test]
async fn transparent_png_is_flattened() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part(
        "image",
        file_part(common::transparent_png_bytes(8, 8), "clear.png", "image/png"),
    );
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let (bucket, key) = split_reference(body["image"].as_str().unwrap());
    let decoded = image::load_from_memory(&h.store.object(&bucket, &key).unwrap().data).unwrap();
    assert!(!decoded.color().has_alpha());
    assert_eq!(decoded.to_rgb8().get_pixel(4, 4).0, [255, 255, 255]);
}

#[tokio::test]
async fn invalid_image_is_400_and_nothing_is_written() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part(
        "image",
        file_part(b"this is not an image".to_vec(), "fake.png", "image/png"),
    );
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"image": ["Upload a valid image. The file you uploaded was either not an image or a corrupted image."]})
    );
    assert_eq!(h.store.object_count(), 0);
    assert_eq!(h.record_count(), 0);
    assert_eq!(h.contributor_count(), 0);
}

#[tokio::test]
async fn empty_file_is_400() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(Vec::new(), "empty.png", "image/png"));
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 400);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["image"][0], "The submitted file is empty.");
}

#[tokio::test]
async fn storage_failure_fails_request_without_db_writes() {
    let h = TestHarness::with_server().await;
    h.store.set_unavailable(true);

    let form = record_form("Ann").part("image", file_part(png_bytes(4, 4), "a.png", "image/png"));
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 502);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "storage_unavailable");
    assert_eq!(h.record_count(), 0);
    assert_eq!(h.contributor_count(), 0);
}

#[tokio::test]
async fn update_without_image_keeps_image() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(png_bytes(4, 4), "a.png", "image/png"));
    let created: Value = h.post_multipart("/api/records/", form).await.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let resp = h
        .put_json(&format!("/api/records/{id}/update/"), json!({"points": 9}))
        .await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["image"], created["image"]);
    assert_eq!(body["points"], 9);
}

#[tokio::test]
async fn update_with_new_image_replaces_reference_and_keeps_old_object() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(png_bytes(4, 4), "a.png", "image/png"));
    let created: Value = h.post_multipart("/api/records/", form).await.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let form = Form::new().part("image", file_part(jpeg_bytes(6, 6), "b.jpg", "image/jpeg"));
    let resp = h.put_multipart(&format!("/api/records/{id}/update/"), form).await;
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_ne!(body["image"], created["image"]);
    assert_eq!(body["contributor"]["name"], "Ann");
    assert_eq!(body["note"], "with photo");

    // The previous object is not deleted.
    assert_eq!(h.store.object_count(), 2);
    let (bucket, key) = split_reference(created["image"].as_str().unwrap());
    assert!(h.store.object(&bucket, &key).is_some());
}

#[tokio::test]
async fn image_can_be_cleared() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(png_bytes(4, 4), "a.png", "image/png"));
    let created: Value = h.post_multipart("/api/records/", form).await.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let resp = h
        .patch_json(&format!("/api/records/{id}/"), json!({"image": null}))
        .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["image"].is_null());
}

#[tokio::test]
async fn image_redirect_points_at_store_url() {
    let h = TestHarness::with_server().await;

    let form = record_form("Ann").part("image", file_part(png_bytes(4, 4), "a.png", "image/png"));
    let created: Value = h.post_multipart("/api/records/", form).await.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    let resp = h.get(&format!("/api/records/{id}/image/")).await;
    assert_eq!(resp.status(), 307);

    let location = resp.headers()["location"].to_str().unwrap();
    assert_eq!(
        location,
        format!("memory://{}", created["image"].as_str().unwrap())
    );
}

#[tokio::test]
async fn image_redirect_404_without_image() {
    let h = TestHarness::with_server().await;
    let created = h.create_record("Ann", 1, "no photo").await;
    let id = created["id"].as_i64().unwrap();

    assert_eq!(h.get(&format!("/api/records/{id}/image/")).await.status(), 404);
    assert_eq!(h.get("/api/records/999/image/").await.status(), 404);
}

#[tokio::test]
async fn verbatim_reference_is_stored_but_never_redirected() {
    let h = TestHarness::with_server().await;

    let resp = h
        .post_json(
            "/api/records/",
            json!({"contributor_name": "Ann", "image": "https://example.com/mop.jpg"}),
        )
        .await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["image"], "https://example.com/mop.jpg");
    assert_eq!(h.store.object_count(), 0);

    let id = body["id"].as_i64().unwrap();
    let resp = h.get(&format!("/api/records/{id}/image/")).await;
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().get("location").is_none());
}

#[tokio::test]
async fn image_redirect_refuses_external_urls() {
    let h = TestHarness::with_server().await;
    let created = h.create_record("Ann", 1, "no photo").await;
    let id = created["id"].as_i64().unwrap();

    for reference in [
        "https://evil.example/phish",
        "http://evil.example/phish",
        "javascript://alert(1)",
        "file:///etc/passwd",
    ] {
        let resp = h
            .patch_json(&format!("/api/records/{id}/"), json!({ "image": reference }))
            .await;
        assert_eq!(resp.status(), 200);

        let resp = h.get(&format!("/api/records/{id}/image/")).await;
        assert_eq!(resp.status(), 404, "{reference}");
        assert!(resp.headers().get("location").is_none(), "{reference}");
    }
}

#[tokio::test]
async fn image_redirect_refuses_other_buckets() {
    let h = TestHarness::with_server().await;
    let created = h.create_record("Ann", 1, "no photo").await;
    let id = created["id"].as_i64().unwrap();

    let resp = h
        .patch_json(
            &format!("/api/records/{id}/"),
            json!({"image": "private-bucket/secrets.txt"}),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = h.get(&format!("/api/records/{id}/image/")).await;
    assert_eq!(resp.status(), 404);
    assert!(resp.headers().get("location").is_none());

    // A hand-written reference into the photo bucket is still presigned.
    let reference = format!("{BUCKET}/existing.jpg");
    h.patch_json(&format!("/api/records/{id}/"), json!({ "image": reference }))
        .await;
    let resp = h.get(&format!("/api/records/{id}/image/")).await;
    assert_eq!(resp.status(), 307);
    assert_eq!(resp.headers()["location"], format!("memory://{reference}").as_str());
}

#[tokio::test]
async fn upload_without_normalization_stores_original_bytes() {
    let mut config = test_config();
    config.images.normalize = false;
    let h = TestHarness::with_server_config(config).await;

    let data = png_bytes(10, 10);
    let form = record_form("Ann").part("image", file_part(data.clone(), "raw.png", "image/png"));
    let resp = h.post_multipart("/api/records/", form).await;
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let (bucket, key) = split_reference(body["image"].as_str().unwrap());
    assert_eq!(h.store.object(&bucket, &key).unwrap().data.as_ref(), data.as_slice());
}
