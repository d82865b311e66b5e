//! The Sapphire II stream cipher engine.
//!
//! Port of Michael Paul Johnson's 1994 design as used by module
//! distributors: byte-at-a-time, all arithmetic mod 256. A keyed engine
//! shuffles the deck from the key with a rejection-sampled index stream;
//! an unkeyed engine (empty key) starts from the fixed hashing state.

/// Cipher state. One engine per record read; see [`decipher_in_place`].
pub struct Sapphire {
    cards: [u8; 256],
    rotor: u8,
    ratchet: u8,
    avalanche: u8,
    last_plain: u8,
    last_cipher: u8,
}

impl Sapphire {
    /// Build an engine for `key`. An empty key yields the fixed initial
    /// state used for hashing rather than a degenerate all-zero deck.
    pub fn new(key: &[u8]) -> Sapphire {
        let mut engine = Sapphire {
            cards: [0; 256],
            rotor: 0,
            ratchet: 0,
            avalanche: 0,
            last_plain: 0,
            last_cipher: 0,
        };
        if key.is_empty() {
            engine.hash_init();
        } else {
            engine.key_init(key);
        }
        engine
    }

    fn hash_init(&mut self) {
        self.rotor = 1;
        self.ratchet = 3;
        self.avalanche = 5;
        self.last_plain = 7;
        self.last_cipher = 11;
        for (i, card) in self.cards.iter_mut().enumerate() {
            *card = (255 - i) as u8;
        }
    }

    fn key_init(&mut self, key: &[u8]) {
        for (i, card) in self.cards.iter_mut().enumerate() {
            *card = i as u8;
        }

        let mut keypos = 0;
        let mut rsum = 0u8;
        for i in (0..=255u8).rev() {
            let toswap = self.keyrand(i, key, &mut keypos, &mut rsum);
            self.cards.swap(i as usize, toswap as usize);
        }

        self.rotor = self.cards[1];
        self.ratchet = self.cards[3];
        self.avalanche = self.cards[5];
        self.last_plain = self.cards[7];
        self.last_cipher = self.cards[rsum as usize];
    }

    /// Key-driven value in `0..=limit`, drawn with just enough mask bits
    /// and rejection of overshoot. Bounded retries keep rare unlucky key
    /// streams from spinning.
    fn keyrand(&mut self, limit: u8, key: &[u8], keypos: &mut usize, rsum: &mut u8) -> u8 {
        if limit == 0 {
            return 0;
        }
        let mut mask = 1u16;
        while mask < u16::from(limit) {
            mask = (mask << 1) + 1;
        }

        let mut retries = 0;
        loop {
            *rsum = self.cards[*rsum as usize].wrapping_add(key[*keypos]);
            *keypos += 1;
            if *keypos >= key.len() {
                *keypos = 0;
                *rsum = rsum.wrapping_add(key.len() as u8);
            }
            let mut drawn = (mask as u8) & *rsum;
            retries += 1;
            if retries > 11 {
                drawn %= limit;
            }
            if drawn <= limit {
                return drawn;
            }
        }
    }

    /// Advance the deck for one byte: ratchet by the rotor card, step the
    /// rotor, rotate four positions, fold the swapped card into the
    /// avalanche register.
    fn shuffle(&mut self) {
        self.ratchet = self.ratchet.wrapping_add(self.cards[self.rotor as usize]);
        self.rotor = self.rotor.wrapping_add(1);
        let swaptemp = self.cards[self.last_cipher as usize];
        self.cards[self.last_cipher as usize] = self.cards[self.ratchet as usize];
        self.cards[self.ratchet as usize] = self.cards[self.last_plain as usize];
        self.cards[self.last_plain as usize] = self.cards[self.rotor as usize];
        self.cards[self.rotor as usize] = swaptemp;
        self.avalanche = self.avalanche.wrapping_add(self.cards[swaptemp as usize]);
    }

    fn keystream(&self) -> u8 {
        let a = self.cards[self.ratchet as usize].wrapping_add(self.cards[self.rotor as usize]);
        let b = self.cards[self.last_plain as usize]
            .wrapping_add(self.cards[self.last_cipher as usize])
            .wrapping_add(self.cards[self.avalanche as usize]);
        self.cards[a as usize] ^ self.cards[self.cards[b as usize] as usize]
    }

    /// Decipher one byte.
    pub fn decipher(&mut self, byte: u8) -> u8 {
        self.shuffle();
        self.last_plain = byte ^ self.keystream();
        self.last_cipher = byte;
        self.last_plain
    }

    /// Encipher one byte.
    pub fn encipher(&mut self, byte: u8) -> u8 {
        self.shuffle();
        self.last_cipher = byte ^ self.keystream();
        self.last_plain = byte;
        self.last_cipher
    }

    /// Zero all state.
    pub fn burn(&mut self) {
        self.cards = [0; 256];
        self.rotor = 0;
        self.ratchet = 0;
        self.avalanche = 0;
        self.last_plain = 0;
        self.last_cipher = 0;
    }
}

impl Drop for Sapphire {
    fn drop(&mut self) {
        self.burn();
    }
}

/// Decipher `bytes` in place. An empty key is the unlocked case and
/// leaves the buffer untouched.
pub fn decipher_in_place(key: &[u8], bytes: &mut [u8]) {
    if key.is_empty() {
        return;
    }
    let mut engine = Sapphire::new(key);
    for byte in bytes.iter_mut() {
        *byte = engine.decipher(*byte);
    }
}

/// Encipher `bytes` in place. An empty key leaves the buffer untouched.
pub fn encipher_in_place(key: &[u8], bytes: &mut [u8]) {
    if key.is_empty() {
        return;
    }
    let mut engine = Sapphire::new(key);
    for byte in bytes.iter_mut() {
        *byte = engine.encipher(*byte);
    }
}
