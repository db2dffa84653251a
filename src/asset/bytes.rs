use std::path::Path;

use crate::asset::{AssetError, Result};

/// Positioned random-access reads over one object container.
///
/// All reads are absolute; implementations keep no cursor and must be safe
/// to call in any order.
pub trait ByteSource {
	/// Total length of the addressable byte range.
	fn len(&self) -> i64;

	/// Read exactly `out.len()` bytes starting at `offset`.
	fn read_into(&self, offset: i64, out: &mut [u8]) -> Result<()>;

	/// Whether the addressable range is empty.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Read one unsigned byte.
	fn read_u8(&self, offset: i64) -> Result<u8> {
		let mut buf = [0_u8; 1];
		self.read_into(offset, &mut buf)?;
		Ok(buf[0])
	}

	/// Read one signed byte.
	fn read_i8(&self, offset: i64) -> Result<i8> {
		Ok(self.read_u8(offset)? as i8)
	}

	/// Read a little-endian `i16`.
	fn read_i16(&self, offset: i64) -> Result<i16> {
		let mut buf = [0_u8; 2];
		self.read_into(offset, &mut buf)?;
		Ok(i16::from_le_bytes(buf))
	}

	/// Read a little-endian `u16`.
	fn read_u16(&self, offset: i64) -> Result<u16> {
		let mut buf = [0_u8; 2];
		self.read_into(offset, &mut buf)?;
		Ok(u16::from_le_bytes(buf))
	}

	/// Read a little-endian `i32`.
	fn read_i32(&self, offset: i64) -> Result<i32> {
		let mut buf = [0_u8; 4];
		self.read_into(offset, &mut buf)?;
		Ok(i32::from_le_bytes(buf))
	}

	/// Read a little-endian `u32`.
	fn read_u32(&self, offset: i64) -> Result<u32> {
		let mut buf = [0_u8; 4];
		self.read_into(offset, &mut buf)?;
		Ok(u32::from_le_bytes(buf))
	}

	/// Read a little-endian `i64`.
	fn read_i64(&self, offset: i64) -> Result<i64> {
		let mut buf = [0_u8; 8];
		self.read_into(offset, &mut buf)?;
		Ok(i64::from_le_bytes(buf))
	}

	/// Read a little-endian `u64`.
	fn read_u64(&self, offset: i64) -> Result<u64> {
		let mut buf = [0_u8; 8];
		self.read_into(offset, &mut buf)?;
		Ok(u64::from_le_bytes(buf))
	}

	/// Read a little-endian `f32`.
	fn read_f32(&self, offset: i64) -> Result<f32> {
		let mut buf = [0_u8; 4];
		self.read_into(offset, &mut buf)?;
		Ok(f32::from_le_bytes(buf))
	}

	/// Read a little-endian `f64`.
	fn read_f64(&self, offset: i64) -> Result<f64> {
		let mut buf = [0_u8; 8];
		self.read_into(offset, &mut buf)?;
		Ok(f64::from_le_bytes(buf))
	}

	/// Read `len` raw bytes into a new buffer.
	fn read_bytes(&self, offset: i64, len: usize) -> Result<Vec<u8>> {
		let mut buf = vec![0_u8; len];
		self.read_into(offset, &mut buf)?;
		Ok(buf)
	}

	/// Read `len` bytes and decode them as UTF-8 text, lossily.
	fn read_string(&self, offset: i64, len: usize) -> Result<String> {
		let buf = self.read_bytes(offset, len)?;
		Ok(String::from_utf8_lossy(&buf).into_owned())
	}
}

/// Byte source over a borrowed in-memory slice.
pub struct SliceSource<'a> {
	bytes: &'a [u8],
}

impl<'a> SliceSource<'a> {
	/// Wrap a borrowed byte slice.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes }
	}
}

impl ByteSource for SliceSource<'_> {
	fn len(&self) -> i64 {
		self.bytes.len() as i64
	}

	fn read_into(&self, offset: i64, out: &mut [u8]) -> Result<()> {
		let start = check_range(self.bytes.len(), offset, out.len())?;
		out.copy_from_slice(&self.bytes[start..start + out.len()]);
		Ok(())
	}
}

/// Byte source that owns the full contents of a file.
pub struct FileSource {
	bytes: Vec<u8>,
}

impl FileSource {
	/// Read a whole file into memory.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		Ok(Self {
			bytes: std::fs::read(path)?,
		})
	}

	/// Wrap an owned byte buffer.
	pub fn from_bytes(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}
}

impl ByteSource for FileSource {
	fn len(&self) -> i64 {
		self.bytes.len() as i64
	}

	fn read_into(&self, offset: i64, out: &mut [u8]) -> Result<()> {
		let start = check_range(self.bytes.len(), offset, out.len())?;
		out.copy_from_slice(&self.bytes[start..start + out.len()]);
		Ok(())
	}
}

fn check_range(len: usize, offset: i64, need: usize) -> Result<usize> {
	if offset < 0 {
		return Err(AssetError::NegativeOffset { offset });
	}

	let start = offset as u64 as usize;
	let end = start.checked_add(need);
	if start > len || end.is_none_or(|end| end > len) {
		return Err(AssetError::UnexpectedEof {
			at: offset,
			need,
			rem: (len as i64).saturating_sub(offset).max(0),
		});
	}

	Ok(start)
}

#[cfg(test)]
mod tests {
	use crate::asset::{AssetError, ByteSource, SliceSource};

	#[test]
	fn positioned_reads_decode_little_endian() {
		let mut bytes = Vec::new();
		bytes.extend_from_slice(&7_i32.to_le_bytes());
		bytes.extend_from_slice(&(-2_i64).to_le_bytes());
		bytes.extend_from_slice(&1.5_f32.to_le_bytes());
		bytes.extend_from_slice(b"ab");

		let source = SliceSource::new(&bytes);
		assert_eq!(source.read_i32(0).expect("i32 reads"), 7);
		assert_eq!(source.read_i64(4).expect("i64 reads"), -2);
		assert_eq!(source.read_f32(12).expect("f32 reads"), 1.5);
		assert_eq!(source.read_string(16, 2).expect("string reads"), "ab");

		// Out-of-order re-read of an earlier offset must still work.
		assert_eq!(source.read_u8(0).expect("u8 reads"), 7);
	}

	#[test]
	fn short_reads_report_position_and_need() {
		let bytes = [0_u8; 4];
		let source = SliceSource::new(&bytes);

		let err = source.read_i64(2).expect_err("read past end fails");
		match err {
			AssetError::UnexpectedEof { at, need, rem } => {
				assert_eq!(at, 2);
				assert_eq!(need, 8);
				assert_eq!(rem, 2);
			}
			other => panic!("unexpected error: {other}"),
		}

		let err = source.read_u8(-1).expect_err("negative offset fails");
		assert!(matches!(err, AssetError::NegativeOffset { offset: -1 }));
	}
}
