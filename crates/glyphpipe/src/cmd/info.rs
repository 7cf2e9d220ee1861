use glyphpipe_frame::{
    Opcode, DEFAULT_MAX_DRAW_PAYLOAD, DEFAULT_MAX_TRAILING, DESCRIPTOR_SIZE, FRAME_SIZE,
    HEADER_SIZE, LENGTH_PREFIX_SIZE, PAGE_SIZE, PAYLOAD_AREA_SIZE,
};
use serde::Serialize;

use crate::cmd::InfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{key_value_table, OutputFormat};

#[derive(Serialize)]
struct OpcodeInfo {
    value: u32,
    name: &'static str,
    trailing: Option<&'static str>,
}

#[derive(Serialize)]
struct ProtocolInfo {
    frame_size: usize,
    header_size: usize,
    descriptor_size: usize,
    payload_area_size: usize,
    page_size: usize,
    max_trailing_size: usize,
    payload_length_prefix: usize,
    max_draw_payload: usize,
    byte_order: &'static str,
    opcodes: Vec<OpcodeInfo>,
}

fn trailing_rule(opcode: Opcode) -> Option<&'static str> {
    match opcode {
        Opcode::GlyphImage => Some("row_bytes * height"),
        Opcode::GlyphPath => Some("path_size"),
        Opcode::FontMetrics | Opcode::GlyphMetrics => None,
    }
}

fn protocol_info() -> ProtocolInfo {
    ProtocolInfo {
        frame_size: FRAME_SIZE,
        header_size: HEADER_SIZE,
        descriptor_size: DESCRIPTOR_SIZE,
        payload_area_size: PAYLOAD_AREA_SIZE,
        page_size: PAGE_SIZE,
        max_trailing_size: DEFAULT_MAX_TRAILING,
        payload_length_prefix: LENGTH_PREFIX_SIZE,
        max_draw_payload: DEFAULT_MAX_DRAW_PAYLOAD,
        byte_order: "little-endian",
        opcodes: Opcode::ALL
            .into_iter()
            .map(|opcode| OpcodeInfo {
                value: opcode.as_u32(),
                name: opcode.name(),
                trailing: trailing_rule(opcode),
            })
            .collect(),
    }
}

pub fn run(_args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let info = protocol_info();
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut rows = vec![
                ("frame size", info.frame_size.to_string()),
                ("header size", info.header_size.to_string()),
                ("descriptor size", info.descriptor_size.to_string()),
                ("payload area size", info.payload_area_size.to_string()),
                ("max trailing size", info.max_trailing_size.to_string()),
                ("max draw payload", info.max_draw_payload.to_string()),
                ("byte order", info.byte_order.to_string()),
            ];
            for opcode in &info.opcodes {
                rows.push((
                    opcode.name,
                    format!(
                        "opcode {} trailing {}",
                        opcode.value,
                        opcode.trailing.unwrap_or("none")
                    ),
                ));
            }
            println!("{}", key_value_table(&rows));
        }
        OutputFormat::Pretty => {
            println!("Wire frame ({} bytes, {}):", info.frame_size, info.byte_order);
            println!("  opcode            u32");
            println!("  font id           u32");
            println!("  scaler descriptor {} bytes", info.descriptor_size);
            println!("  payload area      {} bytes", info.payload_area_size);
            println!("Limits:");
            println!("  max trailing      {} bytes", info.max_trailing_size);
            println!(
                "  draw payload      u{} length prefix, max {} bytes",
                info.payload_length_prefix * 8,
                info.max_draw_payload
            );
            println!("Opcodes:");
            for opcode in &info.opcodes {
                println!(
                    "  {} {:<14} trailing: {}",
                    opcode.value,
                    opcode.name,
                    opcode.trailing.unwrap_or("none")
                );
            }
        }
    }
    Ok(SUCCESS)
}
