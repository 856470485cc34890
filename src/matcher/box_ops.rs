//! Box format conversions and overlap measures used by the matching cost.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, aview1};

/// Axis-aligned bounding box stored in corner form.
///
/// Supports the two formats the matcher deals with:
/// - CXCYWH: Center X, Center Y, Width, Height
/// - XYXY: Min X, Min Y, Max X, Max Y
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    /// Left edge
    pub x_min: f32,
    /// Top edge
    pub y_min: f32,
    /// Right edge
    pub x_max: f32,
    /// Bottom edge
    pub y_max: f32,
}

impl BBox {
    /// Create a new box from corner coordinates (XYXY format).
    #[inline]
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Create a box from CXCYWH format (center x, center y, width, height).
    #[inline]
    pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x_min: cx - 0.5 * w,
            y_min: cy - 0.5 * h,
            x_max: cx + 0.5 * w,
            y_max: cy + 0.5 * h,
        }
    }

    #[inline]
    fn from_xyxy_row(row: ArrayView1<'_, f32>) -> Self {
        Self::new(row[0], row[1], row[2], row[3])
    }

    /// Convert to XYXY format: (x_min, y_min, x_max, y_max).
    #[inline]
    pub fn to_xyxy(&self) -> [f32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    /// Convert to CXCYWH format: (center_x, center_y, width, height).
    #[inline]
    pub fn to_cxcywh(&self) -> [f32; 4] {
        [
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
            self.width(),
            self.height(),
        ]
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Whether the corners are ordered (`x_max >= x_min` and `y_max >= y_min`).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x_max >= self.x_min && self.y_max >= self.y_min
    }

    /// Area of the overlap with another box, 0 when disjoint.
    pub fn intersection_area(&self, other: &BBox) -> f32 {
        let w = (self.x_max.min(other.x_max) - self.x_min.max(other.x_min)).max(0.0);
        let h = (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0);
        w * h
    }

    /// Smallest box containing both boxes.
    pub fn enclosing(&self, other: &BBox) -> BBox {
        BBox::new(
            self.x_min.min(other.x_min),
            self.y_min.min(other.y_min),
            self.x_max.max(other.x_max),
            self.y_max.max(other.y_max),
        )
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    pub fn iou(&self, other: &BBox) -> f32 {
        let inter_area = self.intersection_area(other);
        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        }
    }

    /// Generalized IoU: IoU minus the share of the enclosing box not covered by the union.
    ///
    /// Lies in `(-1, 1]` for boxes with positive area; disjoint boxes score below 0.
    pub fn generalized_iou(&self, other: &BBox) -> f32 {
        let inter_area = self.intersection_area(other);
        let union_area = self.area() + other.area() - inter_area;
        let enclosing_area = self.enclosing(other).area();

        let iou = if union_area > 0.0 {
            inter_area / union_area
        } else {
            0.0
        };
        if enclosing_area > 0.0 {
            iou - (enclosing_area - union_area) / enclosing_area
        } else {
            iou
        }
    }
}

fn all_valid(boxes: ArrayView2<'_, f32>) -> bool {
    boxes
        .outer_iter()
        .all(|row| BBox::from_xyxy_row(row).is_valid())
}

/// Convert an `N x 4` array of CXCYWH boxes to XYXY.
pub fn box_cxcywh_to_xyxy(boxes: ArrayView2<'_, f32>) -> Array2<f32> {
    debug_assert_eq!(boxes.ncols(), 4, "boxes must have 4 coordinates");
    let mut out = Array2::zeros(boxes.raw_dim());
    for (i, row) in boxes.outer_iter().enumerate() {
        let b = BBox::from_cxcywh(row[0], row[1], row[2], row[3]);
        out.row_mut(i).assign(&aview1(&b.to_xyxy()));
    }
    out
}

/// Convert an `N x 4` array of XYXY boxes to CXCYWH.
pub fn box_xyxy_to_cxcywh(boxes: ArrayView2<'_, f32>) -> Array2<f32> {
    debug_assert_eq!(boxes.ncols(), 4, "boxes must have 4 coordinates");
    let mut out = Array2::zeros(boxes.raw_dim());
    for (i, row) in boxes.outer_iter().enumerate() {
        out.row_mut(i)
            .assign(&aview1(&BBox::from_xyxy_row(row).to_cxcywh()));
    }
    out
}

/// Areas of an `N x 4` array of XYXY boxes.
pub fn box_area(boxes: ArrayView2<'_, f32>) -> Array1<f32> {
    boxes
        .outer_iter()
        .map(|row| BBox::from_xyxy_row(row).area())
        .collect()
}

/// Pairwise IoU between two sets of XYXY boxes.
///
/// Returns `(iou, union)`, both of shape (M, N) where M is the length of `boxes_a`
/// and N is the length of `boxes_b`.
pub fn box_iou(
    boxes_a: ArrayView2<'_, f32>,
    boxes_b: ArrayView2<'_, f32>,
) -> (Array2<f32>, Array2<f32>) {
    let a: Vec<BBox> = boxes_a.outer_iter().map(BBox::from_xyxy_row).collect();
    let b: Vec<BBox> = boxes_b.outer_iter().map(BBox::from_xyxy_row).collect();

    let mut iou = Array2::zeros((a.len(), b.len()));
    let mut union = Array2::zeros((a.len(), b.len()));
    for (i, ba) in a.iter().enumerate() {
        for (j, bb) in b.iter().enumerate() {
            let inter_area = ba.intersection_area(bb);
            let union_area = ba.area() + bb.area() - inter_area;
            union[[i, j]] = union_area;
            iou[[i, j]] = if union_area > 0.0 {
                inter_area / union_area
            } else {
                0.0
            };
        }
    }
    (iou, union)
}

/// Pairwise generalized IoU between two sets of XYXY boxes, shape (M, N).
///
/// Boxes must have ordered corners. Degenerate boxes are a caller error and are
/// only checked in debug builds.
pub fn generalized_box_iou(boxes_a: ArrayView2<'_, f32>, boxes_b: ArrayView2<'_, f32>) -> Array2<f32> {
    debug_assert!(all_valid(boxes_a), "boxes_a has x_max < x_min or y_max < y_min");
    debug_assert!(all_valid(boxes_b), "boxes_b has x_max < x_min or y_max < y_min");

    let b: Vec<BBox> = boxes_b.outer_iter().map(BBox::from_xyxy_row).collect();
    let mut giou = Array2::zeros((boxes_a.nrows(), b.len()));
    for (i, row) in boxes_a.outer_iter().enumerate() {
        let ba = BBox::from_xyxy_row(row);
        for (j, bb) in b.iter().enumerate() {
            giou[[i, j]] = ba.generalized_iou(bb);
        }
    }
    giou
}
