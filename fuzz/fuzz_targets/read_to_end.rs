#![no_main]

use std::io::{self, Read};
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use wholefile::{GrowableReader, TrackingPool, TransferConfig, TransferError};

/// Serves the input in reads sized by the first byte.
struct Chopped<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Chopped<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.step.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fuzz_target!(|input: &[u8]| {
    let Some((&step, data)) = input.split_first() else {
        return;
    };
    let step = usize::from(step).max(1);

    for max in [16usize, 600, 4096] {
        let pool = Arc::new(TrackingPool::new());
        let config = TransferConfig::new(16, max).unwrap();
        let reader = GrowableReader::new(config, pool.clone()).unwrap();

        // Unknown length: succeeds up to and including the ceiling
        let result = reader.read_to_end(&mut Chopped { data, step }, None);
        if data.len() <= max {
            assert_eq!(result.unwrap(), data);
        } else {
            assert!(matches!(result, Err(TransferError::FileTooLarge { .. })));
        }
        assert_eq!(pool.outstanding(), 0);

        // Advertised length larger than the content
        let claimed = data.len() as u64 + 1;
        let result = reader.read_to_end(&mut Chopped { data, step }, Some(claimed));
        if claimed as usize <= max {
            assert!(matches!(result, Err(TransferError::UnexpectedEndOfFile { .. })));
        } else {
            assert!(matches!(result, Err(TransferError::FileTooLarge { .. })));
        }
    }
});
