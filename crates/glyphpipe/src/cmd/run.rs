use std::collections::BTreeSet;
use std::time::Instant;

use glyphpipe_frame::{read_payload, write_payload, FontId, DEFAULT_MAX_DRAW_PAYLOAD};
use glyphpipe_rpc::{
    Endpoint, LaunchConfig, RoleKind, RpcClient, RpcError, RpcServer, SyntheticFace,
    SyntheticProvider, Topology,
};
use tracing::{error, info};

use crate::cmd::RunArgs;
use crate::drawlist::{DrawList, RunParams};
use crate::exit::{draw_list_error, io_error, rpc_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_report, OutputFormat, ReplayTiming, RunReport};
use crate::replay::{replay, DirectSource, ReplaySummary};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let list = load_draw_list(&args)?;
    let payload = list
        .encode()
        .map_err(|err| CliError::new(INTERNAL, format!("cannot encode draw list: {err}")))?;
    let fonts = list.fonts();

    let expected = if args.verify {
        let summary = replay(&mut DirectSource(provider_for(&fonts)), &list)
            .map_err(|err| rpc_error("reference replay failed", err))?;
        Some(summary)
    } else {
        None
    };

    let config = LaunchConfig {
        mode: args.mode.into(),
        parent: args.parent.into(),
    };
    let labels = (args.mode.name(), RoleKind::from(args.parent).name());
    let repeat = args.repeat;
    info!(
        mode = labels.0,
        parent = labels.1,
        runs = list.runs.len(),
        payload = payload.len(),
        repeat,
        "starting session"
    );

    Topology::new()
        .and_then(|topology| {
            topology.launch(
                config,
                move |endpoint| produce(endpoint, &fonts, &payload),
                move |endpoint| consume(endpoint, expected, labels, repeat, format),
            )
        })
        .map_err(|err| rpc_error("session failed", err))?;

    Ok(SUCCESS)
}

fn load_draw_list(args: &RunArgs) -> CliResult<DrawList> {
    let Some(path) = &args.draw_list else {
        let mut params = RunParams::with_size(args.size);
        params.mask = args.mask;
        params.hinting = args.hinting;
        let list = DrawList::from_text(&args.text, args.font, params);
        list.validate()
            .map_err(|err| draw_list_error("invalid text run", err))?;
        return Ok(list);
    };

    let bytes = std::fs::read(path)
        .map_err(|err| io_error(&format!("cannot read {}", path.display()), err))?;
    DrawList::decode(&bytes).map_err(|err| draw_list_error(&path.display().to_string(), err))
}

fn provider_for(fonts: &BTreeSet<FontId>) -> SyntheticProvider {
    fonts.iter().fold(SyntheticProvider::new(), |provider, font_id| {
        provider.with_face(*font_id, SyntheticFace::default())
    })
}

/// Renderer role: send the draw list, then answer glyph requests until the
/// rasterizer hangs up.
fn produce(
    endpoint: Endpoint,
    fonts: &BTreeSet<FontId>,
    payload: &[u8],
) -> glyphpipe_rpc::Result<()> {
    let (reader, mut writer) = endpoint.into_parts();
    write_payload(&mut writer, payload)?;

    let mut provider = provider_for(fonts);
    let summary = RpcServer::new(&mut provider, reader, writer).serve()?;
    let cache = provider.cache_stats();
    info!(
        requests = summary.requests,
        contexts = cache.entries,
        cache_hits = cache.hits,
        cache_misses = cache.misses,
        "renderer finished"
    );
    Ok(())
}

/// Rasterizer role: receive the draw list, replay it `repeat` times over RPC
/// and report.
fn consume(
    endpoint: Endpoint,
    expected: Option<ReplaySummary>,
    labels: (&'static str, &'static str),
    repeat: u32,
    format: OutputFormat,
) -> glyphpipe_rpc::Result<()> {
    let (mut reader, writer) = endpoint.into_parts();
    let Some(payload) = read_payload(&mut reader, DEFAULT_MAX_DRAW_PAYLOAD)? else {
        info!("renderer closed before sending a draw list; nothing to replay");
        return Ok(());
    };
    let list = DrawList::decode(&payload).map_err(|err| RpcError::Session(err.to_string()))?;

    let mut client = RpcClient::new(reader, writer);
    let started = Instant::now();
    let summary = replay(&mut client, &list)?;
    for pass in 2..=repeat {
        let again = replay(&mut client, &list)?;
        if again != summary {
            error!(
                pass,
                first = ?summary,
                actual = ?again,
                "replay pass differs from the first"
            );
            return Err(RpcError::Session(format!(
                "pass {pass} checksum {:016x} differs from first pass {:016x}",
                again.checksum, summary.checksum
            )));
        }
    }
    let elapsed = started.elapsed();
    let stats = client.stats();
    drop(client);
    info!(
        passes = repeat,
        elapsed_ms = elapsed.as_micros() as f64 / 1000.0,
        requests = stats.requests,
        "rasterizer finished"
    );

    let verified = match expected {
        Some(expected) if expected != summary => {
            error!(?expected, actual = ?summary, "replay differs from in-process reference");
            return Err(RpcError::Session(format!(
                "replay checksum {:016x} differs from reference {:016x}",
                summary.checksum, expected.checksum
            )));
        }
        Some(_) => Some(true),
        None => None,
    };

    let timing = ReplayTiming {
        passes: repeat,
        elapsed,
    };
    let report = RunReport::new(labels.0, labels.1, &summary, &stats, timing, verified);
    print_report(&report, format)
        .map_err(|err| RpcError::Session(format!("cannot write report: {err}")))
}
