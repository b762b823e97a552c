use byteorder::{BigEndian, ByteOrder};

use crate::error::ParseError;

use super::{
    ConstPackedSizeBytes, FromBytes, Header, HeaderByte1, LeapIndicator, Mode, ShortFormat,
    Stratum, TimestampFormat, ToBytes, Version,
};

fn ensure_len(buf: &[u8], needed: usize) -> Result<(), ParseError> {
    if buf.len() < needed {
        return Err(ParseError::BufferTooShort {
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

impl FromBytes for ShortFormat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let seconds = BigEndian::read_u16(&buf[0..2]);
        let fraction = BigEndian::read_u16(&buf[2..4]);
        Ok((ShortFormat { seconds, fraction }, Self::PACKED_SIZE_BYTES))
    }
}

impl FromBytes for TimestampFormat {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let seconds = BigEndian::read_u32(&buf[0..4]);
        let fraction = BigEndian::read_u32(&buf[4..8]);
        Ok((
            TimestampFormat { seconds, fraction },
            Self::PACKED_SIZE_BYTES,
        ))
    }
}

impl FromBytes for HeaderByte1 {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let li_vn_mode = buf[0];
        let li = LeapIndicator::from_bits(li_vn_mode >> 6);
        let vn = Version((li_vn_mode >> 3) & 0b111);
        let mode = Mode::from_bits(li_vn_mode);
        Ok(((li, vn, mode), 1))
    }
}

impl FromBytes for Header {
    fn from_bytes(buf: &[u8]) -> Result<(Self, usize), ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;

        let mut offset = 0;

        let ((leap_indicator, version, mode), n) = HeaderByte1::from_bytes(&buf[offset..])?;
        offset += n;

        let stratum = Stratum(buf[offset]);
        offset += 1;

        let poll = buf[offset] as i8;
        offset += 1;

        let precision = buf[offset] as i8;
        offset += 1;

        let (root_delay, n) = ShortFormat::from_bytes(&buf[offset..])?;
        offset += n;

        let (root_dispersion, n) = ShortFormat::from_bytes(&buf[offset..])?;
        offset += n;

        let mut reference_id = [0u8; 4];
        reference_id.copy_from_slice(&buf[offset..offset + 4]);
        offset += 4;

        let (reference_timestamp, n) = TimestampFormat::from_bytes(&buf[offset..])?;
        offset += n;

        let (origin_timestamp, n) = TimestampFormat::from_bytes(&buf[offset..])?;
        offset += n;

        let (receive_timestamp, n) = TimestampFormat::from_bytes(&buf[offset..])?;
        offset += n;

        let (transmit_timestamp, n) = TimestampFormat::from_bytes(&buf[offset..])?;
        offset += n;

        Ok((
            Header {
                leap_indicator,
                version,
                mode,
                stratum,
                poll,
                precision,
                root_delay,
                root_dispersion,
                reference_id,
                reference_timestamp,
                origin_timestamp,
                receive_timestamp,
                transmit_timestamp,
            },
            offset,
        ))
    }
}

impl ToBytes for ShortFormat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        BigEndian::write_u16(&mut buf[0..2], self.seconds);
        BigEndian::write_u16(&mut buf[2..4], self.fraction);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for TimestampFormat {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        BigEndian::write_u32(&mut buf[0..4], self.seconds);
        BigEndian::write_u32(&mut buf[4..8], self.fraction);
        Ok(Self::PACKED_SIZE_BYTES)
    }
}

impl ToBytes for HeaderByte1 {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;
        let (li, vn, mode) = *self;
        buf[0] = ((li as u8) << 6) | ((vn.value() & 0b111) << 3) | (mode as u8);
        Ok(1)
    }
}

impl ToBytes for Header {
    fn to_bytes(&self, buf: &mut [u8]) -> Result<usize, ParseError> {
        ensure_len(buf, Self::PACKED_SIZE_BYTES)?;

        let mut offset = 0;
        offset += (self.leap_indicator, self.version, self.mode).to_bytes(&mut buf[offset..])?;
        buf[offset] = self.stratum.0;
        offset += 1;
        buf[offset] = self.poll as u8;
        offset += 1;
        buf[offset] = self.precision as u8;
        offset += 1;
        offset += self.root_delay.to_bytes(&mut buf[offset..])?;
        offset += self.root_dispersion.to_bytes(&mut buf[offset..])?;
        buf[offset..offset + 4].copy_from_slice(&self.reference_id);
        offset += 4;
        offset += self.reference_timestamp.to_bytes(&mut buf[offset..])?;
        offset += self.origin_timestamp.to_bytes(&mut buf[offset..])?;
        offset += self.receive_timestamp.to_bytes(&mut buf[offset..])?;
        offset += self.transmit_timestamp.to_bytes(&mut buf[offset..])?;
        Ok(offset)
    }
}
