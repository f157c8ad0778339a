//! Zero-mean template statistics for ZNCC scoring.

use crate::image::ImageView;
use crate::util::{PrepError, PrepResult};

/// Variance at or below this value marks a template as flat.
pub(crate) const MIN_TEMPLATE_VARIANCE: f64 = 1e-8;

/// Precomputed statistics and zero-mean buffer for template matching.
///
/// `t_prime[i] = t[i] - mean` and `var_t = sum(t_prime^2)`, so the ZNCC score
/// at a placement reduces to `sum(t_prime * I) / sqrt(var_t * var_I)`.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f64,
    var_t: f64,
    t_prime: Vec<f64>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> PrepResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(PrepError::InvalidDimensions { width, height })?;

        let mut values = Vec::with_capacity(count);
        for y in 0..height {
            let row = tpl.row(y).ok_or(PrepError::BufferTooSmall {
                needed: (y + 1) * tpl.stride(),
                got: 0,
            })?;
            values.extend(row.iter().map(|&v| f64::from(v)));
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let t_prime: Vec<f64> = values.into_iter().map(|v| v - mean).collect();
        let var_t: f64 = t_prime.iter().map(|v| v * v).sum();
        if var_t / count as f64 <= MIN_TEMPLATE_VARIANCE {
            return Err(PrepError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            mean,
            var_t,
            t_prime,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Returns the sum of squared deviations from the mean.
    pub fn var_t(&self) -> f64 {
        self.var_t
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn t_prime(&self) -> &[f64] {
        &self.t_prime
    }
}

#[cfg(test)]
mod tests {
    use super::TemplatePlan;
    use crate::image::ImageView;
    use crate::util::PrepError;

    #[test]
    fn plan_matches_known_stats() {
        let data = [0u8, 1, 2, 3];
        let view = ImageView::from_slice(&data, 2, 2).unwrap();
        let plan = TemplatePlan::from_view(view).unwrap();

        assert!((plan.mean() - 1.5).abs() < 1e-12);
        assert!((plan.var_t() - 5.0).abs() < 1e-12);
        assert_eq!(plan.t_prime(), &[-1.5, -0.5, 0.5, 1.5]);
    }

    #[test]
    fn plan_rejects_flat_templates() {
        let data = [9u8; 6];
        let view = ImageView::from_slice(&data, 3, 2).unwrap();
        let err = TemplatePlan::from_view(view).err().unwrap();
        assert_eq!(
            err,
            PrepError::DegenerateTemplate {
                reason: "zero variance",
            }
        );
    }
}
