use crate::common::{MAX_UPLOAD_SIZE, TestApp, routes};

const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

mod upload {
    use super::*;

    #[tokio::test]
    async fn first_upload_creates_record() {
        let app = TestApp::spawn().await;

        let res = app.upload("notes.txt", b"hello world".to_vec(), None).await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["original_filename"], "notes.txt");
        assert_eq!(res.body["file_type"], "text/plain");
        assert_eq!(res.body["size"], 11);
        assert_eq!(res.body["reference_count"], 1);
        assert_eq!(
            res.body["file_hash"],
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(res.body["uploaded_at"].as_str().is_some());
        assert_eq!(app.stored_blob_count(), 1);
    }

    #[tokio::test]
    async fn identical_content_is_stored_once() {
        let app = TestApp::spawn().await;
        let content = vec![b'A'; 100];

        let first = app.upload("a.txt", content.clone(), None).await;
        assert_eq!(first.status, 201);

        let second = app
            .upload("renamed.bin", content, Some("application/octet-stream"))
            .await;
        assert_eq!(second.status, 200);
        assert_eq!(second.id(), first.id());
        assert_eq!(second.body["file_hash"], first.body["file_hash"]);
        assert_eq!(second.body["reference_count"], 2);
        // First uploader's metadata wins.
        assert_eq!(second.body["original_filename"], "a.txt");
        assert_eq!(second.body["file_type"], "text/plain");

        assert_eq!(app.stored_blob_count(), 1);
        assert_eq!(app.staging_file_count(), 0);
    }

    #[tokio::test]
    async fn different_content_gets_separate_records() {
        let app = TestApp::spawn().await;

        let a = app.upload("same.txt", b"one".to_vec(), None).await;
        let b = app.upload("same.txt", b"two".to_vec(), None).await;

        assert_eq!(a.status, 201);
        assert_eq!(b.status, 201);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.body["file_hash"], b.body["file_hash"]);
        assert_eq!(app.stored_blob_count(), 2);
    }

    #[tokio::test]
    async fn empty_file_is_valid_content() {
        let app = TestApp::spawn().await;

        let res = app.upload("empty.dat", Vec::new(), None).await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["size"], 0);
        assert_eq!(res.body["file_hash"], EMPTY_SHA256);

        let again = app.upload("other-empty.dat", Vec::new(), None).await;
        assert_eq!(again.status, 200);
        assert_eq!(again.body["reference_count"], 2);
    }

    #[tokio::test]
    async fn declared_mime_type_is_kept() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("data.txt", b"{}".to_vec(), Some("application/json"))
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["file_type"], "application/json");
    }

    #[tokio::test]
    async fn unknown_extension_falls_back_to_octet_stream() {
        let app = TestApp::spawn().await;

        let res = app.upload("blob", b"\x00\x01".to_vec(), None).await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["file_type"], "application/octet-stream");
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn().await;

        let form = reqwest::multipart::Form::new().text("comment", "no file here");
        let res = app.post_form(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_blob_count(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_and_cleaned_up() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("big.bin", vec![0u8; MAX_UPLOAD_SIZE as usize + 1], None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_blob_count(), 0);
        assert_eq!(app.staging_file_count(), 0);

        let list = app.get(routes::FILES).await;
        assert_eq!(list.body["total"], 0);
    }

    #[tokio::test]
    async fn upload_at_limit_is_accepted() {
        let app = TestApp::spawn().await;

        let res = app
            .upload("edge.bin", vec![7u8; MAX_UPLOAD_SIZE as usize], None)
            .await;
        assert_eq!(res.status, 201);
        assert_eq!(res.body["size"], MAX_UPLOAD_SIZE);
    }

    #[tokio::test]
    async fn concurrent_identical_uploads_share_one_record() {
        let app = TestApp::spawn().await;
        let content = b"race me".to_vec();

        let names: Vec<String> = (0..16).map(|i| format!("copy-{i}.txt")).collect();
        let uploads = names
            .iter()
            .map(|name| app.upload(name, content.clone(), None));
        let results = futures::future::join_all(uploads).await;

        let created = results.iter().filter(|r| r.status == 201).count();
        assert_eq!(created, 1);
        assert!(results.iter().all(|r| r.status == 200 || r.status == 201));

        let list = app.get(routes::FILES).await;
        assert_eq!(list.body["total"], 1);
        assert_eq!(list.body["files"][0]["reference_count"], 16);
    }
}

mod savings {
    use super::*;

    #[tokio::test]
    async fn empty_store_reports_zero() {
        let app = TestApp::spawn().await;

        let res = app.get(routes::STORAGE_SAVINGS).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total_logical_bytes"], 0);
        assert_eq!(res.body["unique_stored_bytes"], 0);
        assert_eq!(res.body["savings_bytes"], 0);
        assert_eq!(res.body["savings_percentage"], 0.0);
    }

    #[tokio::test]
    async fn repeated_upload_halves_storage() {
        let app = TestApp::spawn().await;
        let content = vec![b'A'; 100];

        app.upload("a.txt", content.clone(), None).await;
        app.upload("a.txt", content, None).await;

        let res = app.get(routes::STORAGE_SAVINGS).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total_logical_bytes"], 200);
        assert_eq!(res.body["unique_stored_bytes"], 100);
        assert_eq!(res.body["savings_bytes"], 100);
        assert_eq!(res.body["savings_percentage"], 50.0);
    }

    #[tokio::test]
    async fn mixed_uploads_are_accounted_per_content() {
        let app = TestApp::spawn().await;

        for _ in 0..3 {
            app.upload("x.bin", vec![1u8; 40], None).await;
        }
        app.upload("y.bin", vec![2u8; 80], None).await;

        let res = app.get(routes::STORAGE_SAVINGS).await;
        assert_eq!(res.body["total_logical_bytes"], 200);
        assert_eq!(res.body["unique_stored_bytes"], 120);
        assert_eq!(res.body["savings_bytes"], 80);
        assert_eq!(res.body["savings_percentage"], 40.0);
    }
}

mod listing {
    use super::*;

    fn filenames(res: &crate::common::TestResponse) -> Vec<String> {
        res.body["files"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["original_filename"].as_str().unwrap().to_string())
            .collect()
    }

    async fn seeded_app() -> TestApp {
        let app = TestApp::spawn().await;
        app.upload("Report-2024.pdf", vec![1u8; 300], Some("application/pdf"))
            .await;
        app.upload("photo.png", vec![2u8; 50], Some("image/png"))
            .await;
        app.upload("annual_report.txt", vec![3u8; 10], Some("text/plain"))
            .await;
        app
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let app = seeded_app().await;

        let res = app.get(routes::FILES).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 3);
        assert_eq!(
            filenames(&res),
            ["annual_report.txt", "photo.png", "Report-2024.pdf"]
        );
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let app = seeded_app().await;

        let res = app.get_with_query(routes::FILES, &[("search", "REPORT")]).await;
        assert_eq!(filenames(&res), ["annual_report.txt", "Report-2024.pdf"]);
    }

    #[tokio::test]
    async fn filters_by_type_and_size() {
        let app = seeded_app().await;

        let by_type = app
            .get_with_query(routes::FILES, &[("file_type", "image/png")])
            .await;
        assert_eq!(filenames(&by_type), ["photo.png"]);

        let by_size = app
            .get_with_query(routes::FILES, &[("min_size", "50"), ("max_size", "300")])
            .await;
        assert_eq!(filenames(&by_size), ["photo.png", "Report-2024.pdf"]);
    }

    #[tokio::test]
    async fn filters_by_date() {
        let app = seeded_app().await;

        let future = app
            .get_with_query(routes::FILES, &[("start_date", "2999-01-01")])
            .await;
        assert_eq!(future.status, 200);
        assert_eq!(future.body["total"], 0);

        // Inverted bounds are swapped, so this still spans today.
        let swapped = app
            .get_with_query(
                routes::FILES,
                &[("start_date", "2999-01-01"), ("end_date", "2000-01-01")],
            )
            .await;
        assert_eq!(swapped.body["total"], 3);
    }

    #[tokio::test]
    async fn rejects_malformed_filters() {
        let app = seeded_app().await;

        let res = app
            .get_with_query(routes::FILES, &[("start_date", "yesterday")])
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app
            .get_with_query(routes::FILES, &[("min_size", "10"), ("max_size", "1")])
            .await;
        assert_eq!(res.status, 400);
    }
}

mod retrieval {
    use super::*;

    #[tokio::test]
    async fn get_returns_metadata() {
        let app = TestApp::spawn().await;
        let uploaded = app.upload("doc.txt", b"contents".to_vec(), None).await;

        let res = app.get(&routes::file(&uploaded.id())).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, uploaded.body);
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&routes::file("01936f0e-1234-7abc-8000-000000000001"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn get_malformed_id_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get(&routes::file("not-a-uuid")).await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn download_streams_original_bytes() {
        let app = TestApp::spawn().await;
        let content = b"downloadable payload".to_vec();
        let uploaded = app.upload("payload.txt", content.clone(), None).await;

        let res = app.get(&routes::file_download(&uploaded.id())).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.bytes, content);
        assert_eq!(res.header("content-type"), Some("text/plain"));
        assert_eq!(
            res.header("content-length"),
            Some(content.len().to_string().as_str())
        );
        assert!(
            res.header("content-disposition")
                .unwrap()
                .contains("filename=\"payload.txt\"")
        );
        let expected_etag = format!("\"{}\"", uploaded.body["file_hash"].as_str().unwrap());
        assert_eq!(res.header("etag"), Some(expected_etag.as_str()));
    }

    #[tokio::test]
    async fn download_honours_if_none_match() {
        let app = TestApp::spawn().await;
        let uploaded = app.upload("cached.txt", b"cache me".to_vec(), None).await;
        let path = routes::file_download(&uploaded.id());

        let etag = app.get(&path).await.header("etag").unwrap().to_string();

        let res = app.get_with_header(&path, "If-None-Match", &etag).await;
        assert_eq!(res.status, 304);
        assert!(res.bytes.is_empty());

        let stale = app
            .get_with_header(&path, "If-None-Match", "\"something-else\"")
            .await;
        assert_eq!(stale.status, 200);
    }

    #[tokio::test]
    async fn download_unknown_id_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get(&routes::file_download("01936f0e-1234-7abc-8000-000000000001"))
            .await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}
