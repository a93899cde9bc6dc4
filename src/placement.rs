// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Exhaustive placement of pending images into holes.
//!
//! Every image is tried in every hole that still has room. A complete
//! assignment is scored by the sum of squared leftover hole sizes, which
//! favours leaving free space in few large holes. Only a strictly better
//! score replaces the incumbent, so the first assignment found wins ties.

use crate::error::{MapError, Result};
use crate::hole::Hole;
use crate::image::PendingImage;
use tracing::{debug, info, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    assignment: Vec<usize>,
    score: u128,
}

impl Placement {
    /// Hole index committed for each image, in image order.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn hole_of(&self, image: usize) -> Option<usize> {
        self.assignment.get(image).copied()
    }

    pub fn score(&self) -> u128 {
        self.score
    }
}

struct Search<'a> {
    sizes: &'a [u32],
    remaining: Vec<u64>,
    tentative: Vec<usize>,
    best: Option<(u128, Vec<usize>)>,
    tried: u64,
}

impl Search<'_> {
    fn descend(&mut self, image: usize) {
        if image == self.sizes.len() {
            self.record();
            return;
        }
        let size = self.sizes[image] as u64;
        for hole in 0..self.remaining.len() {
            if self.remaining[hole] >= size {
                self.remaining[hole] -= size;
                self.tentative[image] = hole;
                self.descend(image + 1);
                self.remaining[hole] += size;
            }
        }
    }

    fn record(&mut self) {
        self.tried += 1;
        let score: u128 = self.remaining.iter().map(|&r| (r as u128) * (r as u128)).sum();
        let better = self.best.as_ref().map_or(true, |(best, _)| score > *best);
        if better {
            debug!(score, assignment = ?self.tentative, "best placement so far");
            self.best = Some((score, self.tentative.clone()));
        } else {
            trace!(score, "placement tried");
        }
    }
}

/// Assigns every image to a hole, maximising the sum of squared leftovers.
///
/// Fails with `TooManyImages` above `max_images` and with `Infeasible` when
/// no complete assignment exists.
pub fn place(images: &[PendingImage], holes: &[Hole], max_images: usize) -> Result<Placement> {
    if images.len() > max_images {
        return Err(MapError::TooManyImages {
            count: images.len(),
            limit: max_images,
        });
    }

    let sizes: Vec<u32> = images.iter().map(|image| image.size).collect();
    let mut search = Search {
        sizes: &sizes,
        remaining: holes.iter().map(|hole| hole.size as u64).collect(),
        tentative: vec![0; images.len()],
        best: None,
        tried: 0,
    };
    search.descend(0);

    match search.best {
        Some((score, assignment)) => {
            info!(images = images.len(), tried = search.tried, score, "placement found");
            Ok(Placement { assignment, score })
        }
        None => Err(MapError::Infeasible {
            images: images.len(),
            image_bytes: sizes.iter().map(|&s| s as u64).sum(),
            holes: holes.len(),
            hole_bytes: holes.iter().map(|hole| hole.size as u64).sum(),
        }),
    }
}
