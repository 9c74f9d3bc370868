use std::hint::black_box;

use bencher::{BOUNDARY, TestCase, TestFile, TestGroup};
use bytes::{Bytes, BytesMut};
use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use http::Request;
use http_body_util::Full;
use needle_upload::UploadDecoder;
use needle_upload::codec::MultipartDecoder;
use needle_upload::protocol::MultipartItem;
use tokio_util::codec::Decoder;

const SIZE_LIMIT: u64 = 64 * 1024 * 1024;

fn create_test_cases() -> Vec<TestCase> {
    vec![
        TestCase::small("small_text", TestFile::text("small.txt", 512)),
        TestCase::normal("text_64k", TestFile::text("volume.log", 64 * 1024)),
        TestCase::normal("binary_64k", TestFile::binary("blob.dat", 64 * 1024)),
        TestCase::normal("binary_64k_after_field", TestFile::binary("blob.dat", 64 * 1024).with_leading_field()),
        TestCase::large("text_4m", TestFile::text("volume.log", 4 * 1024 * 1024)),
        TestCase::large("binary_4m", TestFile::binary("blob.dat", 4 * 1024 * 1024)),
    ]
}

fn configure(group: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>, case: &TestCase) {
    match case.group() {
        TestGroup::Small | TestGroup::Normal => group.sample_size(100),
        TestGroup::Large => group.sample_size(20),
    };
}

fn benchmark_multipart_decoder(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("multipart_decoder");

    for case in create_test_cases() {
        let body = case.body();
        configure(&mut group, &case);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &body, |b, body| {
            b.iter_batched_ref(
                || (MultipartDecoder::new(BOUNDARY), BytesMut::from(&body[..])),
                |(decoder, bytes_mut)| {
                    let mut size = 0;
                    loop {
                        match decoder.decode(bytes_mut).expect("input should be a valid multipart body") {
                            Some(MultipartItem::Chunk(bytes)) => size += bytes.len(),
                            Some(MultipartItem::Eof) => break,
                            Some(_) => (),
                            None => panic!("input should be complete"),
                        }
                    }
                    black_box(size);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_upload_decoder(criterion: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().expect("tokio runtime should build");
    let decoder = &UploadDecoder::new();
    let mut group = criterion.benchmark_group("upload_decoder");

    for case in create_test_cases() {
        let body = Bytes::from(case.body());
        let content_type = case.content_type();
        let file_name = case.file_name();
        configure(&mut group, &case);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &body, |b, body| {
            b.to_async(&runtime).iter_batched(
                || {
                    Request::builder()
                        .method("POST")
                        .uri("/3,01637037d6")
                        .header(http::header::CONTENT_TYPE, &content_type)
                        .body(Full::new(body.clone()))
                        .expect("request should build")
                },
                |request| async move {
                    let upload = decoder.decode(request, SIZE_LIMIT).await.expect("upload should decode");
                    assert_eq!(upload.file_name(), file_name);
                    black_box(upload.into_data());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(multipart, benchmark_multipart_decoder, benchmark_upload_decoder);
criterion_main!(multipart);
