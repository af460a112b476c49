use crate::internal::*;
use itertools::Itertools;

/// Reshape to a fixed shape. A single `-1` dimension is inferred from the
/// input volume.
#[derive(Debug, Clone, new, Default, PartialEq)]
pub struct Reshape {
    pub shape: TVec<isize>,
}

impl Reshape {
    pub fn output_shape(&self, input: &[usize]) -> DiffResult<TVec<usize>> {
        let volume: usize = input.iter().product();
        ensure!(
            self.shape.iter().filter(|d| **d == -1).count() <= 1,
            "At most one dimension can be inferred in {:?}",
            self.shape
        );
        let known: usize = self.shape.iter().filter(|d| **d >= 0).map(|d| *d as usize).product();
        let shape = self
            .shape
            .iter()
            .map(|&d| match d {
                -1 if known > 0 => Ok(volume / known),
                -1 => bail!("Can not infer a dimension next to a zero-sized one"),
                d if d >= 0 => Ok(d as usize),
                d => bail!("Invalid dimension {d}"),
            })
            .collect::<DiffResult<TVec<usize>>>()?;
        ensure!(
            shape.iter().product::<usize>() == volume,
            "Can not reshape {:?} to {:?}",
            input,
            self.shape
        );
        Ok(shape)
    }
}

impl Op for Reshape {
    fn name(&self) -> Cow<'_, str> {
        "Reshape".into()
    }

    fn info(&self) -> DiffResult<Vec<String>> {
        Ok(vec![format!("to shape: {}", self.shape.iter().join("x"))])
    }
}

impl EvalOp for Reshape {
    fn eval(&self, mut inputs: TVec<TValue>) -> DiffResult<TVec<TValue>> {
        let input = args_1!(inputs);
        let shape = self.output_shape(input.shape())?;
        let tensor = Arc::unwrap_or_clone(input);
        Ok(tvec!(tensor.into_shape(&shape)?.into_arc_tensor()))
    }
}

impl TypedOp for Reshape {
    as_op!();

    fn output_facts(&self, inputs: &[&TypedFact]) -> DiffResult<TVec<TypedFact>> {
        ensure!(inputs.len() == 1, "Reshape expects 1 input");
        let shape = self.output_shape(&inputs[0].shape)?;
        Ok(tvec!(TypedFact::dt_shape(inputs[0].datum_type, &shape)))
    }
}
