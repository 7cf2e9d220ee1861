//! Glyph outline type and its trailing-bytes encoding.
//!
//! Encoding:
//! ```text
//! verb count (u32 LE) | fill rule (u8) | { tag (u8) | points (f32 LE x/y pairs) }*
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// A 2D point in glyph space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One outline drawing command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathVerb {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    CubicTo(Point, Point, Point),
    Close,
}

impl PathVerb {
    fn tag(&self) -> u8 {
        match self {
            PathVerb::MoveTo(_) => 0,
            PathVerb::LineTo(_) => 1,
            PathVerb::QuadTo(..) => 2,
            PathVerb::CubicTo(..) => 3,
            PathVerb::Close => 4,
        }
    }

    fn point_count(&self) -> usize {
        match self {
            PathVerb::MoveTo(_) | PathVerb::LineTo(_) => 1,
            PathVerb::QuadTo(..) => 2,
            PathVerb::CubicTo(..) => 3,
            PathVerb::Close => 0,
        }
    }
}

/// How overlapping contours are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FillRule {
    #[default]
    NonZero = 0,
    EvenOdd = 1,
}

/// A glyph outline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub fill_rule: FillRule,
    verbs: Vec<PathVerb>,
}

const PATH_HEADER_SIZE: usize = 5;

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.verbs.push(PathVerb::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.verbs.push(PathVerb::LineTo(Point::new(x, y)));
        self
    }

    pub fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) -> &mut Self {
        self.verbs
            .push(PathVerb::QuadTo(Point::new(cx, cy), Point::new(x, y)));
        self
    }

    pub fn cubic_to(&mut self, c1: Point, c2: Point, end: Point) -> &mut Self {
        self.verbs.push(PathVerb::CubicTo(c1, c2, end));
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.verbs.push(PathVerb::Close);
        self
    }

    pub fn verbs(&self) -> &[PathVerb] {
        &self.verbs
    }

    pub fn is_empty(&self) -> bool {
        self.verbs.is_empty()
    }

    /// Total number of points across all verbs.
    pub fn point_count(&self) -> usize {
        self.verbs.iter().map(PathVerb::point_count).sum()
    }

    /// Exact number of bytes [`Path::encode`] will produce.
    pub fn encoded_len(&self) -> usize {
        PATH_HEADER_SIZE + self.verbs.len() + self.point_count() * 8
    }

    /// Append the encoded outline to `dst` and return the number of bytes written.
    pub fn encode(&self, dst: &mut BytesMut) -> usize {
        let len = self.encoded_len();
        dst.reserve(len);
        dst.put_u32_le(self.verbs.len() as u32);
        dst.put_u8(self.fill_rule as u8);
        for verb in &self.verbs {
            dst.put_u8(verb.tag());
            match verb {
                PathVerb::MoveTo(p) | PathVerb::LineTo(p) => put_point(dst, p),
                PathVerb::QuadTo(c, p) => {
                    put_point(dst, c);
                    put_point(dst, p);
                }
                PathVerb::CubicTo(c1, c2, p) => {
                    put_point(dst, c1);
                    put_point(dst, c2);
                    put_point(dst, p);
                }
                PathVerb::Close => {}
            }
        }
        len
    }

    /// Decode an outline from exactly the bytes [`Path::encode`] produced.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        if src.len() < PATH_HEADER_SIZE {
            return Err(FrameError::MalformedPath("truncated header"));
        }
        let count = src.get_u32_le() as usize;
        let fill_rule = match src.get_u8() {
            0 => FillRule::NonZero,
            1 => FillRule::EvenOdd,
            _ => return Err(FrameError::MalformedPath("unknown fill rule")),
        };
        // Every verb takes at least its tag byte.
        if count > src.len() {
            return Err(FrameError::MalformedPath("verb count exceeds data"));
        }

        let mut verbs = Vec::with_capacity(count);
        for _ in 0..count {
            if !src.has_remaining() {
                return Err(FrameError::MalformedPath("truncated verb"));
            }
            let verb = match src.get_u8() {
                0 => PathVerb::MoveTo(get_point(&mut src)?),
                1 => PathVerb::LineTo(get_point(&mut src)?),
                2 => PathVerb::QuadTo(get_point(&mut src)?, get_point(&mut src)?),
                3 => PathVerb::CubicTo(
                    get_point(&mut src)?,
                    get_point(&mut src)?,
                    get_point(&mut src)?,
                ),
                4 => PathVerb::Close,
                _ => return Err(FrameError::MalformedPath("unknown verb tag")),
            };
            verbs.push(verb);
        }
        if src.has_remaining() {
            return Err(FrameError::MalformedPath("trailing bytes after last verb"));
        }

        Ok(Self { fill_rule, verbs })
    }
}

fn put_point(dst: &mut BytesMut, point: &Point) {
    dst.put_f32_le(point.x);
    dst.put_f32_le(point.y);
}

fn get_point(src: &mut &[u8]) -> Result<Point> {
    if src.remaining() < 8 {
        return Err(FrameError::MalformedPath("truncated point"));
    }
    Ok(Point::new(src.get_f32_le(), src.get_f32_le()))
}
