//! The demo plot: a framed sine and cosine with a key.

use plotterm::terminal::{Justify, TermLayer};
use plotterm::Terminal;

const SAMPLES: u32 = 200;

/// Device-space plot area inside the canvas margins.
struct Frame {
    left: u32,
    bottom: u32,
    width: u32,
    height: u32,
}

impl Frame {
    fn inside(xmax: u32, ymax: u32) -> Self {
        let left = xmax / 10;
        let bottom = ymax / 10;
        Self {
            left,
            bottom,
            width: xmax - 2 * left,
            height: ymax - 2 * bottom,
        }
    }

    /// Map `t` in 0..=1 and `v` in -1..=1 to device coordinates.
    fn at(&self, t: f64, v: f64) -> (u32, u32) {
        let x = f64::from(self.left) + t * f64::from(self.width);
        let y = f64::from(self.bottom) + (v + 1.0) / 2.0 * f64::from(self.height);
        (x.round() as u32, y.round() as u32)
    }
}

pub(crate) fn draw(term: &mut Terminal) {
    let (xmax, ymax) = term.canvas();
    let frame = Frame::inside(xmax, ymax);

    term.linetype(-2);
    term.linewidth(1.0);
    let corners = [
        frame.at(0.0, -1.0),
        frame.at(1.0, -1.0),
        frame.at(1.0, 1.0),
        frame.at(0.0, 1.0),
    ];
    term.move_to(corners[3].0, corners[3].1);
    for (x, y) in corners {
        term.vector(x, y);
    }

    term.linetype(-1);
    let (x0, y0) = frame.at(0.0, 0.0);
    let (x1, _) = frame.at(1.0, 0.0);
    term.move_to(x0, y0);
    term.vector(x1, y0);

    term.justify_text(Justify::Centre);
    let (tx, ty) = frame.at(0.5, 1.0);
    term.put_text(tx, ty + ymax / 20, b"plotterm demo");

    curve(term, &frame, 1, "sin(x)", f64::sin);
    curve(term, &frame, 2, "cos(x)", f64::cos);
}

fn curve(term: &mut Terminal, frame: &Frame, lt: i32, label: &str, f: fn(f64) -> f64) {
    term.layer(TermLayer::BeforePlot);

    // Key entry in the top-right corner.
    let (kx, ky) = frame.at(0.8, 0.9 - 0.12 * f64::from(lt - 1));
    term.justify_text(Justify::Right);
    term.put_text(kx, ky, label.as_bytes());
    term.layer(TermLayer::BeginKeySample);
    term.linetype(lt);
    term.move_to(kx + 100, ky);
    term.vector(kx + 500, ky);
    term.layer(TermLayer::EndKeySample);

    let mut first = true;
    for i in 0..=SAMPLES {
        let t = f64::from(i) / f64::from(SAMPLES);
        let (x, y) = frame.at(t, f(t * std::f64::consts::TAU));
        if first {
            term.move_to(x, y);
            first = false;
        } else {
            term.vector(x, y);
        }
    }
    term.pointsize(1.0);
    for i in (0..=SAMPLES).step_by(25) {
        let t = f64::from(i) / f64::from(SAMPLES);
        let (x, y) = frame.at(t, f(t * std::f64::consts::TAU));
        term.point(x, y, lt);
    }
    term.layer(TermLayer::AfterPlot);
}
