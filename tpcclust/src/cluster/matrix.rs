use log::warn;
use tpccore::data::digit::Digit;

/// Zero cells around the real grid on every side; a 7×7 window centred on any
/// real cell stays inside the allocation.
pub const GRID_PADDING: usize = 3;

/// 5×5 charge window, indexed `[pad offset + 2][time offset + 2]`.
pub type Window5 = [[f32; 5]; 5];
/// 7×7 charge window, indexed `[pad offset + 3][time offset + 3]`.
pub type Window7 = [[f32; 7]; 7];
/// Marks which cells of a 5×5 window belong to the real readout grid.
pub type Mask5 = [[bool; 5]; 5];

/// Row-major (pad-major) dense grid with `GRID_PADDING` zero cells on each side.
///
/// Coordinates are signed offsets into the unpadded grid, so `(-1, 0)` is the
/// padding cell left of pad 0.
#[derive(Clone, Debug, Default)]
pub struct PaddedGrid<T> {
    data: Vec<T>,
    pads: usize,
    times: usize,
    stride: usize,
}

impl<T: Copy + Default> PaddedGrid<T> {
    pub fn new(pads: usize, times: usize) -> Self {
        let mut grid = PaddedGrid { data: Vec::new(), pads: 0, times: 0, stride: 0 };
        grid.reset(pads, times);
        grid
    }

    /// Re-shapes the grid and zeroes it, keeping the allocation when it is large enough.
    pub fn reset(&mut self, pads: usize, times: usize) {
        self.pads = pads;
        self.times = times;
        self.stride = times + 2 * GRID_PADDING;
        let len = (pads + 2 * GRID_PADDING) * self.stride;
        self.data.clear();
        self.data.resize(len, T::default());
    }

    #[inline(always)]
    fn offset(&self, pad: isize, time: isize) -> usize {
        let p = pad + GRID_PADDING as isize;
        let t = time + GRID_PADDING as isize;
        debug_assert!(
            p >= 0 && t >= 0 && (p as usize) < self.pads + 2 * GRID_PADDING && (t as usize) < self.stride,
            "grid access ({}, {}) outside padded {}x{} grid",
            pad,
            time,
            self.pads,
            self.times
        );
        p as usize * self.stride + t as usize
    }

    #[inline(always)]
    pub fn get(&self, pad: isize, time: isize) -> T {
        self.data[self.offset(pad, time)]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, pad: isize, time: isize) -> &mut T {
        let idx = self.offset(pad, time);
        &mut self.data[idx]
    }

    pub fn pads(&self) -> usize {
        self.pads
    }

    pub fn times(&self) -> usize {
        self.times
    }

    /// Whether `(pad, time)` is a real (non-padding) cell.
    #[inline]
    pub fn contains(&self, pad: isize, time: isize) -> bool {
        pad >= 0 && time >= 0 && (pad as usize) < self.pads && (time as usize) < self.times
    }

    /// All cells including padding.
    pub fn raw(&self) -> &[T] {
        &self.data
    }
}

/// Outcome of loading a digit list into a [`ChargeMatrix`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FillStats {
    pub filled: usize,
    pub skipped: usize,
}

/// Charge of one pad row: the untouched original samples and a residual copy
/// from which extracted cluster charge is removed.
#[derive(Clone, Debug, Default)]
pub struct ChargeMatrix {
    original: PaddedGrid<u16>,
    residual: PaddedGrid<f32>,
}

impl ChargeMatrix {
    pub fn new(pads: usize, times: usize) -> Self {
        ChargeMatrix {
            original: PaddedGrid::new(pads, times),
            residual: PaddedGrid::new(pads, times),
        }
    }

    pub fn from_digits(pads: usize, times: usize, digits: &[Digit]) -> (Self, FillStats) {
        let mut matrix = ChargeMatrix::new(pads, times);
        let stats = matrix.fill(digits);
        (matrix, stats)
    }

    /// Re-shapes both buffers for a new row and clears them.
    pub fn reset(&mut self, pads: usize, times: usize) {
        self.original.reset(pads, times);
        self.residual.reset(pads, times);
    }

    /// Adds digits to both buffers. Digits outside the row are logged and skipped,
    /// repeated digits of one cell are summed.
    pub fn fill(&mut self, digits: &[Digit]) -> FillStats {
        let mut stats = FillStats::default();
        for d in digits {
            let (pad, time) = (d.pad as isize, d.time as isize);
            if !self.original.contains(pad, time) {
                warn!(
                    "skipping digit outside {}x{} row: pad {} time {} charge {}",
                    self.pads(),
                    self.times(),
                    d.pad,
                    d.time,
                    d.charge
                );
                stats.skipped += 1;
                continue;
            }
            let cell = self.original.get_mut(pad, time);
            *cell = cell.saturating_add(d.charge);
            let value = *cell as f32;
            *self.residual.get_mut(pad, time) = value;
            stats.filled += 1;
        }
        stats
    }

    pub fn pads(&self) -> usize {
        self.original.pads()
    }

    pub fn times(&self) -> usize {
        self.original.times()
    }

    #[inline]
    pub fn contains(&self, pad: isize, time: isize) -> bool {
        self.original.contains(pad, time)
    }

    #[inline(always)]
    pub fn original(&self, pad: isize, time: isize) -> u16 {
        self.original.get(pad, time)
    }

    #[inline(always)]
    pub fn residual(&self, pad: isize, time: isize) -> f32 {
        self.residual.get(pad, time)
    }

    #[inline(always)]
    pub(crate) fn residual_mut(&mut self, pad: isize, time: isize) -> &mut f32 {
        self.residual.get_mut(pad, time)
    }

    /// 5×5 residual charge around `(pad, time)`.
    pub fn residual_window5(&self, pad: usize, time: usize) -> Window5 {
        let mut w = [[0.0f32; 5]; 5];
        let (p, t) = (pad as isize, time as isize);
        for (i, row) in w.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.residual(p + i as isize - 2, t + j as isize - 2);
            }
        }
        w
    }

    /// 7×7 original charge around `(pad, time)`.
    pub fn original_window7(&self, pad: usize, time: usize) -> Window7 {
        let mut w = [[0.0f32; 7]; 7];
        let (p, t) = (pad as isize, time as isize);
        for (i, row) in w.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.original(p + i as isize - 3, t + j as isize - 3) as f32;
            }
        }
        w
    }

    /// Which cells of the 5×5 window around `(pad, time)` are real readout cells.
    pub fn mask5(&self, pad: usize, time: usize) -> Mask5 {
        let mut m = [[false; 5]; 5];
        let (p, t) = (pad as isize, time as isize);
        for (i, row) in m.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = self.contains(p + i as isize - 2, t + j as isize - 2);
            }
        }
        m
    }

    pub fn original_total(&self) -> f64 {
        self.original.raw().iter().map(|&q| q as f64).sum()
    }

    pub fn residual_total(&self) -> f64 {
        self.residual.raw().iter().map(|&q| q as f64).sum()
    }

    /// Smallest residual value over the whole buffer, padding included.
    pub fn residual_min(&self) -> f32 {
        self.residual.raw().iter().copied().fold(f32::INFINITY, f32::min)
    }
}
