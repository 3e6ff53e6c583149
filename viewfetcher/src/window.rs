use crate::client::{DailyViews, PageviewError, Result};

pub const WINDOW_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSums {
    pub recent: u64,
    pub prev: u64,
}

/// Sums the last seven daily points as `recent` and the seven before them as
/// `prev`. Anything shorter than two full windows is rejected.
pub fn window_sums(series: &[DailyViews]) -> Result<WindowSums> {
    let needed = WINDOW_DAYS * 2;
    if series.len() < needed {
        return Err(PageviewError::InsufficientData(format!(
            "{} daily points, need {needed}",
            series.len()
        )));
    }
    let tail = &series[series.len() - needed..];
    let (prev, recent) = tail.split_at(WINDOW_DAYS);
    let sum = |points: &[DailyViews]| points.iter().map(|p| p.views).sum::<u64>();
    Ok(WindowSums {
        recent: sum(recent),
        prev: sum(prev),
    })
}
