pub mod color;
pub mod depth;

use std::marker::PhantomData;

use crate::Error;

pub trait ProcessTrait: Sized {
    fn process<O, P: ProcessorTrait<Self, O>>(self, processor: &P) -> Result<O, Error> {
        processor.process(self)
    }
}

pub trait ProcessorTrait<I, O> {
    fn process(&self, input: I) -> Result<O, Error>;

    fn pipe<'a, 'b, T, P>(&'a self, processor: &'b P) -> PipedProcessor<'a, 'b, I, O, T, Self, P>
    where
        Self: Sized,
        P: ProcessorTrait<O, T>,
    {
        PipedProcessor {
            _input: PhantomData,
            _tmp: PhantomData,
            _output: PhantomData,
            processor1: self,
            processor2: processor,
        }
    }
}

pub struct PipedProcessor<'a, 'b, I, T, O, P1, P2>
where
    P1: ProcessorTrait<I, T>,
    P2: ProcessorTrait<T, O>,
{
    _input: PhantomData<I>,
    _tmp: PhantomData<T>,
    _output: PhantomData<O>,
    processor1: &'a P1,
    processor2: &'b P2,
}

impl<'a, 'b, I, T, O, P1, P2> ProcessorTrait<I, O> for PipedProcessor<'a, 'b, I, T, O, P1, P2>
where
    P1: ProcessorTrait<I, T>,
    P2: ProcessorTrait<T, O>,
{
    fn process(&self, input: I) -> Result<O, Error> {
        self.processor2.process(self.processor1.process(input)?)
    }
}
