use approx::assert_abs_diff_eq;
use bbox::prelude::*;
use label::Class;
use region_dataset::{
    data::{GroundTruth, PixelBox},
    labeler::RegionLabeler,
};

fn cat_at(xyxy: [i32; 4]) -> GroundTruth {
    GroundTruth::try_from_xyxy(xyxy, Class::new("cat")).unwrap()
}

#[test]
fn label_single_ground_truth() {
    let labeler = RegionLabeler::default();
    let gt = [cat_at([10, 10, 50, 50])];
    let candidates = [
        PixelBox::from_xyxy([10, 10, 50, 50]),
        PixelBox::from_xyxy([100, 100, 120, 120]),
        PixelBox::from_xyxy([12, 12, 48, 48]),
    ];

    let labeled = labeler.label(&gt, &candidates);

    assert_eq!(labeled.rois, candidates.to_vec());
    assert_eq!(
        labeled.classes,
        vec![Class::new("cat"), Class::Background, Class::new("cat")]
    );
    assert_eq!(
        labeled.deltas,
        vec![[0, 0, 0, 0], [-90, -90, -70, -70], [-2, -2, 2, 2]]
    );
    assert_eq!(labeled.ious.dim(), (3, 1));
    assert_abs_diff_eq!(labeled.ious[[0, 0]], 1.0, epsilon = 1e-6);
    assert_eq!(labeled.ious[[1, 0]], 0.0);
    assert_abs_diff_eq!(labeled.ious[[2, 0]], 0.81, epsilon = 1e-6);
}

#[test]
fn ambiguous_candidates_are_never_kept() {
    let labeler = RegionLabeler::default();
    let gt = [cat_at([20, 20, 60, 60]), cat_at([50, 10, 90, 40])];

    // slide a window over the image to cover every overlap level
    let candidates: Vec<_> = (0..80)
        .step_by(4)
        .flat_map(|x| (0..60).step_by(4).map(move |y| (x, y)))
        .flat_map(|(x, y)| {
            [20, 30, 40]
                .into_iter()
                .map(move |size| PixelBox::from_xyxy([x, y, x + size, y + size]))
        })
        .collect();

    let labeled = labeler.label(&gt, &candidates);
    assert!(!labeled.rois.is_empty());
    assert!(labeled.rois.len() < candidates.len());

    // the IoU matrix keeps a row for every candidate, discarded ones included
    assert_eq!(labeled.ious.dim(), (candidates.len(), 2));
    let discarded = candidates
        .iter()
        .position(|candidate| !labeled.rois.contains(candidate))
        .unwrap();
    let row = labeled.ious.row(discarded);
    let best = row.iter().copied().fold(0.0, f64::max);
    assert!(best > 0.3 && best <= 0.7);
    for (col, truth) in gt.iter().enumerate() {
        assert_abs_diff_eq!(
            row[col],
            candidates[discarded].iou_with(&truth.rect, 1e-5),
            epsilon = 1e-12
        );
    }

    for (roi, class) in labeled.rois.iter().zip(&labeled.classes) {
        let best = gt
            .iter()
            .map(|gt| roi.iou_with(&gt.rect, 1e-5))
            .fold(0.0, f64::max);
        assert!(!(best > 0.3 && best <= 0.7), "ambiguous IoU {}", best);
        assert_eq!(class.is_background(), best <= 0.3);
    }
}
