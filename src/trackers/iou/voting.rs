use pathfinding::kuhn_munkres::kuhn_munkres;
use pathfinding::matrix::Matrix;

const F32_I64_MULT: f32 = 1_000_000.0;

/// Trait to implement detection-to-track voting engines.
///
/// The engine receives the IoU matrix where rows are detections (in the input order) and
/// columns are tracks (in the creation order), and returns the winning track column for every
/// detection, or `None` when the detection must start a new track. A track column is never
/// returned twice.
///
pub trait Voting {
    fn winners(&self, distances: &[Vec<f32>], tracks: usize) -> Vec<Option<usize>>;
}

/// Input-order greedy voting.
///
/// Every detection selects the free track with the maximal IoU (the earliest track wins a tie)
/// and keeps it when the IoU reaches the threshold. A track claimed by an earlier detection
/// is never given to a later one even if the later one overlaps it better.
///
pub struct GreedyVoting {
    threshold: f32,
}

impl GreedyVoting {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Voting for GreedyVoting {
    fn winners(&self, distances: &[Vec<f32>], tracks: usize) -> Vec<Option<usize>> {
        let mut claimed = vec![false; tracks];
        distances
            .iter()
            .map(|row| {
                let best = row
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(track, _)| !claimed[*track])
                    .fold(None, |best: Option<(usize, f32)>, (track, iou)| match best {
                        Some((_, best_iou)) if best_iou >= iou => best,
                        _ => Some((track, iou)),
                    });
                match best {
                    Some((track, iou)) if iou >= self.threshold => {
                        claimed[track] = true;
                        Some(track)
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

/// Voting engine with Hungarian algorithm.
///
/// Maximizes the total IoU of the assignment, then drops the assigned pairs which are below
/// the threshold.
///
pub struct OptimalVoting {
    threshold: f32,
}

impl OptimalVoting {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }
}

impl Voting for OptimalVoting {
    fn winners(&self, distances: &[Vec<f32>], tracks: usize) -> Vec<Option<usize>> {
        let candidates = distances.len();
        if tracks == 0 || candidates == 0 {
            return vec![None; candidates];
        }

        // every detection gets its own zero-weight column, so rows never outnumber columns
        let mut weights = Matrix::new(candidates, tracks + candidates, 0i64);
        for (row, ious) in distances.iter().enumerate() {
            for (col, iou) in ious.iter().enumerate() {
                weights[(row, col)] = (iou * F32_I64_MULT) as i64;
            }
        }

        let (_, solution) = kuhn_munkres(&weights);

        solution
            .into_iter()
            .enumerate()
            .map(|(row, col)| {
                if col < tracks && distances[row][col] >= self.threshold {
                    Some(col)
                } else {
                    None
                }
            })
            .collect()
    }
}
