use crate::internal::*;

pub mod conv;

pub use self::conv::Conv;

/// Reshape a per-channel vector to `[1, C, 1, ...]` so it broadcasts against
/// an NCHW-like tensor of the given rank.
pub fn wire_reshape_as_channel(
    model: &mut TypedModel,
    name: impl AsRef<str>,
    outlet: OutletId,
    rank: usize,
) -> DiffResult<OutletId> {
    let name = name.as_ref();
    let fact = model.outlet_fact(outlet)?.clone();
    ensure!(fact.rank() == 1, "{name}: expected a channel vector, got {fact:?}");
    let mut shape: TVec<isize> = tvec!(1; rank);
    shape[1] = fact.shape[0] as isize;
    let reshaped =
        model.wire_node(format!("{name}.as_channel"), crate::ops::array::Reshape::new(shape), &[outlet])?;
    Ok(reshaped[0])
}
