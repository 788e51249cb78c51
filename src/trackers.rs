/// IoU tracker with pluggable detection-to-track voting (greedy and Hungarian)
///
pub mod iou;
