//! Client and server talking over real pipes, with the server on a thread.

use std::io::Write;
use std::thread::{self, JoinHandle};

use bytes::BytesMut;
use glyphpipe_frame::{
    encode_request, FontId, FontMetrics, FrameError, FrameReader, FrameWriter, Glyph, GlyphId,
    GlyphMetrics, MaskFormat, Opcode, Path, Request, RequestFrame, ScalerDescriptor,
    ScalerParams, FRAME_SIZE,
};
use glyphpipe_transport::{PipeReader, PipeWriter};

use crate::client::RpcClient;
use crate::error::{Result, RpcError};
use crate::provider::{GlyphProvider, ProviderError, ScalingContext};
use crate::server::{RpcServer, ServeSummary};
use crate::synthetic::{SyntheticFace, SyntheticProvider};
use crate::topology::Topology;

const FONT: FontId = FontId(1);

/// Provider returning fixed, hand-checkable values.
struct FixedProvider(FixedContext);

struct FixedContext;

impl ScalingContext for FixedContext {
    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: 10.0,
            descent: -2.0,
            leading: 1.0,
            ..FontMetrics::default()
        }
    }

    fn glyph_metrics(&self, glyph_id: GlyphId) -> GlyphMetrics {
        GlyphMetrics {
            glyph_id,
            mask_format: MaskFormat::A8,
            advance_x: 9.0,
            width: 8,
            height: 12,
            row_bytes: 8,
            ..GlyphMetrics::default()
        }
    }

    fn render_image(&self, _glyph: &GlyphMetrics, dst: &mut [u8]) {
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = i as u8;
        }
    }

    fn glyph_path(&self, glyph_id: GlyphId) -> Path {
        fixed_path(glyph_id)
    }
}

impl GlyphProvider for FixedProvider {
    type Context = FixedContext;

    fn resolve_context(
        &mut self,
        _font_id: FontId,
        _descriptor: &ScalerDescriptor,
    ) -> std::result::Result<&FixedContext, ProviderError> {
        Ok(&self.0)
    }
}

fn fixed_path(glyph_id: GlyphId) -> Path {
    let x = f32::from(glyph_id);
    let mut path = Path::new();
    path.move_to(x, 0.0).line_to(x, 10.0).line_to(0.0, 10.0).close();
    path
}

fn descriptor() -> ScalerDescriptor {
    ScalerDescriptor::new(&ScalerParams::with_size(12.0)).unwrap()
}

fn synthetic() -> SyntheticProvider {
    SyntheticProvider::new().with_face(FONT, SyntheticFace::default())
}

type Client = RpcClient<PipeReader, PipeWriter>;

/// Start a server on a thread and return the client for the other role.
fn session<P>(provider: P) -> (Client, JoinHandle<Result<ServeSummary>>)
where
    P: GlyphProvider + Send + 'static,
{
    let (producer, consumer) = Topology::new().unwrap().split();
    let (reader, writer) = producer.into_endpoint().into_parts();
    let server = thread::spawn(move || RpcServer::new(provider, reader, writer).serve());

    let (reader, writer) = consumer.into_endpoint().into_parts();
    (RpcClient::new(reader, writer), server)
}

#[test]
fn font_metrics_are_received_exactly() {
    let (mut client, server) = session(FixedProvider(FixedContext));

    let metrics = client.fetch_font_metrics(FONT, &descriptor()).unwrap();
    assert_eq!(metrics.ascent, 10.0);
    assert_eq!(metrics.descent, -2.0);
    assert_eq!(metrics.leading, 1.0);

    drop(client);
    assert_eq!(server.join().unwrap().unwrap().requests, 1);
}

#[test]
fn glyph_image_reads_exactly_row_bytes_times_height() {
    let (mut client, server) = session(FixedProvider(FixedContext));

    let metrics = client.fetch_glyph_metrics(FONT, &descriptor(), 65).unwrap();
    assert_eq!((metrics.row_bytes, metrics.height), (8, 12));

    let mut glyph = Glyph::new(metrics);
    client
        .fetch_glyph_image(FONT, &descriptor(), &mut glyph)
        .unwrap();
    assert_eq!(glyph.image.len(), 96);
    assert_eq!(glyph.image[95], 95);
    assert_eq!(client.stats().trailing_bytes_read, 96);

    drop(client);
    let summary = server.join().unwrap().unwrap();
    assert_eq!(summary.trailing_bytes, 96);
}

#[test]
fn sequential_paths_arrive_in_request_order() {
    let (mut client, server) = session(FixedProvider(FixedContext));

    let first = client.fetch_glyph_path(FONT, &descriptor(), 10).unwrap();
    let second = client.fetch_glyph_path(FONT, &descriptor(), 11).unwrap();
    assert_eq!(first, fixed_path(10));
    assert_eq!(second, fixed_path(11));

    drop(client);
    assert_eq!(server.join().unwrap().unwrap().count(Opcode::GlyphPath), 2);
}

#[test]
fn unknown_opcode_aborts_the_server() {
    let (producer, consumer) = Topology::new().unwrap().split();
    let (reader, writer) = producer.into_endpoint().into_parts();
    let server = thread::spawn(move || {
        RpcServer::new(FixedProvider(FixedContext), reader, writer).serve()
    });

    let mut wire = BytesMut::new();
    encode_request(
        &RequestFrame::new(FONT, descriptor(), Request::FontMetrics),
        &mut wire,
    );
    wire[..4].copy_from_slice(&99u32.to_le_bytes());

    let (reader, mut writer) = consumer.into_endpoint().into_parts();
    writer.write_all(&wire).unwrap();

    let err = server.join().unwrap().unwrap_err();
    assert!(matches!(err, RpcError::Frame(FrameError::UnknownOpcode(99))));

    // The server closed its ends without answering.
    let mut responses = FrameReader::new(reader);
    assert!(responses.read_response().unwrap().is_none());
}

#[test]
fn image_request_with_narrow_rows_aborts_the_server() {
    let (mut client, server) = session(synthetic());

    let mut glyph = Glyph::new(GlyphMetrics {
        glyph_id: 65,
        mask_format: MaskFormat::A8,
        width: 8,
        height: 12,
        row_bytes: 0,
        ..GlyphMetrics::default()
    });
    let err = client
        .fetch_glyph_image(FONT, &descriptor(), &mut glyph)
        .unwrap_err();
    assert!(matches!(err, RpcError::Disconnected(_)));

    let err = server.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        RpcError::Frame(FrameError::InvalidField {
            field: "row_bytes",
            value: 0
        })
    ));
}

#[test]
fn largest_argb_image_crosses_the_pipe() {
    let (mut client, server) = session(synthetic());
    let params = ScalerParams {
        mask_format: MaskFormat::Argb,
        ..ScalerParams::with_size(4000.0)
    };
    let descriptor = ScalerDescriptor::new(&params).unwrap();

    let metrics = client.fetch_glyph_metrics(FONT, &descriptor, 65).unwrap();
    let mut glyph = Glyph::new(metrics);
    client
        .fetch_glyph_image(FONT, &descriptor, &mut glyph)
        .unwrap();
    assert_eq!(glyph.image.len(), metrics.image_size());

    let mut direct = synthetic();
    let context = direct.resolve_context(FONT, &descriptor).unwrap();
    let mut expected = vec![0u8; metrics.image_size()];
    context.render_image(&metrics, &mut expected);
    assert!(glyph.image == expected);

    drop(client);
    assert_eq!(
        server.join().unwrap().unwrap().trailing_bytes,
        metrics.image_size() as u64
    );
}

#[test]
fn every_opcode_matches_direct_provider_calls() {
    let (mut client, server) = session(synthetic());
    let mut direct = synthetic();

    for size in [9.0, 16.0, 31.5] {
        for mask_format in [MaskFormat::Bw, MaskFormat::A8, MaskFormat::Argb] {
            let params = ScalerParams {
                mask_format,
                ..ScalerParams::with_size(size)
            };
            let descriptor = ScalerDescriptor::new(&params).unwrap();
            let context = direct.resolve_context(FONT, &descriptor).unwrap();

            assert_eq!(
                client.fetch_font_metrics(FONT, &descriptor).unwrap(),
                context.font_metrics()
            );

            for glyph_id in [32, 65, 66, 300, 600] {
                let metrics = client
                    .fetch_glyph_metrics(FONT, &descriptor, glyph_id)
                    .unwrap();
                assert_eq!(metrics, context.glyph_metrics(glyph_id));

                let mut glyph = Glyph::new(metrics);
                client
                    .fetch_glyph_image(FONT, &descriptor, &mut glyph)
                    .unwrap();
                let mut expected = vec![0u8; metrics.image_size()];
                context.render_image(&metrics, &mut expected);
                assert_eq!(glyph.image, expected);

                assert_eq!(
                    client.fetch_glyph_path(FONT, &descriptor, glyph_id).unwrap(),
                    context.glyph_path(glyph_id)
                );
            }
        }
    }

    drop(client);
    let summary = server.join().unwrap().unwrap();
    assert_eq!(summary.count(Opcode::FontMetrics), 9);
    assert_eq!(summary.count(Opcode::GlyphMetrics), 45);
}

#[test]
fn calls_alternate_one_write_one_read() {
    let (mut client, server) = session(synthetic());
    let descriptor = descriptor();

    let calls = 7u64;
    for glyph_id in 0..calls as GlyphId {
        client
            .fetch_glyph_metrics(FONT, &descriptor, glyph_id + 40)
            .unwrap();
        let stats = client.stats();
        assert_eq!(stats.requests, u64::from(glyph_id) + 1);
        assert_eq!(stats.frame_bytes_written, stats.frame_bytes_read);
    }

    let stats = client.stats();
    assert_eq!(stats.frame_bytes_written, calls * FRAME_SIZE as u64);
    assert_eq!(stats.trailing_bytes_read, 0);

    drop(client);
    assert_eq!(server.join().unwrap().unwrap().requests, calls);
}

#[test]
fn closing_the_client_ends_the_server_cleanly() {
    let (client, server) = session(synthetic());
    drop(client);
    assert_eq!(server.join().unwrap().unwrap(), ServeSummary::default());
}

#[test]
fn closing_after_a_request_loses_the_response() {
    let (producer, consumer) = Topology::new().unwrap().split();
    let (reader, writer) = producer.into_endpoint().into_parts();
    let server = thread::spawn(move || RpcServer::new(synthetic(), reader, writer).serve());

    let (reader, writer) = consumer.into_endpoint().into_parts();
    drop(reader);
    let mut requests = FrameWriter::new(writer);
    requests
        .write_request(&RequestFrame::new(FONT, descriptor(), Request::FontMetrics))
        .unwrap();
    drop(requests);

    let err = server.join().unwrap().unwrap_err();
    assert!(matches!(
        err,
        RpcError::Frame(FrameError::Io(ref io)) if io.kind() == std::io::ErrorKind::BrokenPipe
    ));
}

#[test]
fn server_exit_mid_session_is_disconnected() {
    let (producer, consumer) = Topology::new().unwrap().split();
    drop(producer);

    let (reader, writer) = consumer.into_endpoint().into_parts();
    let mut client = RpcClient::new(reader, writer);
    let err = client.fetch_font_metrics(FONT, &descriptor()).unwrap_err();
    assert!(matches!(
        err,
        RpcError::Frame(FrameError::Io(_)) | RpcError::Disconnected(_)
    ));
}
